use crate::errors::{AppError, AppResult};
use crate::models::{
    LeaderboardDocument, LeaderboardRow, LeaderboardUser, ScoreEntry, User, UsersDocument,
};
use crate::store::JsonStore;
use chrono::Utc;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_QUERY_LIMIT: usize = 50;

/// Truthiness in the sense of the submission contract: absent, null, empty
/// string, zero, and false all count as missing.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

fn scalar_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

/// Explicit integer coercion: JSON integers pass through, floats truncate
/// toward zero, numeric strings parse. Anything else is a fatal input error
/// naming the field.
fn coerce_int(payload: &Value, key: &str, default: i64) -> AppResult<i64> {
    match payload.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|n| n as i64))
            .ok_or_else(|| AppError::validation(format!("{key} (must be numeric)"))),
        Some(Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::validation(format!("{key} (must be numeric)"))),
        Some(_) => Err(AppError::validation(format!("{key} (must be numeric)"))),
    }
}

fn coerce_float(payload: &Value, key: &str, default: f64) -> AppResult<f64> {
    match payload.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| AppError::validation(format!("{key} (must be numeric)"))),
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| AppError::validation(format!("{key} (must be numeric)"))),
        Some(_) => Err(AppError::validation(format!("{key} (must be numeric)"))),
    }
}

/// User registration plus per-user append-only score tracking.
#[derive(Debug)]
pub struct LeaderboardRepository {
    store: Arc<JsonStore>,
    users_path: PathBuf,
    leaderboard_path: PathBuf,
}

impl LeaderboardRepository {
    pub fn new(store: Arc<JsonStore>, users_path: PathBuf, leaderboard_path: PathBuf) -> Self {
        Self {
            store,
            users_path,
            leaderboard_path,
        }
    }

    /// Registers a user. The id is generated server-side from the current
    /// epoch millis, so it doubles as a creation-order marker.
    pub fn create_user(&self, user_name: &str) -> AppResult<User> {
        let name = user_name.trim();
        let length = name.chars().count();
        if !(2..=50).contains(&length) {
            return Err(AppError::validation("userName"));
        }

        let now = Utc::now();
        let record = User {
            user_id: format!("user_{}", now.timestamp_millis()),
            user_name: name.to_string(),
            created_at: now.to_rfc3339(),
        };

        let _guard = self.store.write_guard();
        let mut doc: UsersDocument = self.store.read(&self.users_path, UsersDocument::default())?;
        doc.users.push(record.clone());
        self.store.write(&self.users_path, &doc)?;
        tracing::debug!(user_id = %record.user_id, "user created");
        Ok(record)
    }

    /// Appends a score entry to the submitting user's record, creating the
    /// record on first submission. The stored `userName` is overwritten on
    /// every submission; entries are never replaced.
    pub fn submit_score(&self, payload: &Value) -> AppResult<ScoreEntry> {
        let mut missing = Vec::new();
        for field in ["userId", "userName", "mode", "score"] {
            if !is_truthy(payload.get(field)) {
                missing.push(field.to_string());
            }
        }
        if !missing.is_empty() {
            return Err(AppError::Validation { fields: missing });
        }

        let user_id = scalar_string(payload.get("userId"));
        let user_name = scalar_string(payload.get("userName"));

        let mut timestamp = scalar_string(payload.get("timestamp"));
        if timestamp.is_empty() {
            timestamp = Utc::now().to_rfc3339();
        }
        let entry = ScoreEntry {
            mode: scalar_string(payload.get("mode")),
            score: coerce_int(payload, "score", 0)?,
            questions_attempted: coerce_int(payload, "questionsAttempted", 0)?,
            correct_answers: coerce_int(payload, "correctAnswers", 0)?,
            accuracy: coerce_float(payload, "accuracy", 0.0)?,
            timestamp,
            duration: coerce_int(payload, "duration", 0)?,
        };

        let _guard = self.store.write_guard();
        let mut doc: LeaderboardDocument = self
            .store
            .read(&self.leaderboard_path, LeaderboardDocument::default())?;
        match doc
            .leaderboard
            .iter_mut()
            .find(|user| user.user_id == user_id)
        {
            Some(user) => {
                user.user_name = user_name;
                user.entries.push(entry.clone());
            }
            None => doc.leaderboard.push(LeaderboardUser {
                user_id,
                user_name,
                entries: vec![entry.clone()],
            }),
        }
        self.store.write(&self.leaderboard_path, &doc)?;
        Ok(entry)
    }

    /// Flattens every user's entries, filters by mode unless `"all"`, and
    /// returns the top `limit` rows by score. Ties keep their encounter
    /// order (user order, then entry order). A zero limit means the default.
    pub fn query(&self, mode: &str, limit: usize) -> AppResult<Vec<LeaderboardRow>> {
        let mode = mode.trim().to_lowercase();
        let doc: LeaderboardDocument = self
            .store
            .read(&self.leaderboard_path, LeaderboardDocument::default())?;

        let mut rows = Vec::new();
        for user in doc.leaderboard {
            for entry in user.entries {
                if mode != "all" && entry.mode != mode {
                    continue;
                }
                rows.push(LeaderboardRow {
                    user_id: user.user_id.clone(),
                    user_name: user.user_name.clone(),
                    entry,
                });
            }
        }
        rows.sort_by(|a, b| b.entry.score.cmp(&a.entry.score));
        let limit = if limit == 0 { DEFAULT_QUERY_LIMIT } else { limit };
        rows.truncate(limit);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_repo() -> (tempfile::TempDir, LeaderboardRepository) {
        let root = tempfile::tempdir().expect("temp data root");
        let repo = LeaderboardRepository::new(
            Arc::new(JsonStore::new()),
            root.path().join("users.json"),
            root.path().join("leaderboard.json"),
        );
        (root, repo)
    }

    fn score_payload(user_id: &str, user_name: &str, mode: &str, score: i64) -> Value {
        json!({
            "userId": user_id,
            "userName": user_name,
            "mode": mode,
            "score": score,
            "questionsAttempted": 12,
            "correctAnswers": 10,
            "accuracy": 83.3,
            "duration": 95,
        })
    }

    #[test]
    fn create_user_enforces_name_length_bounds() {
        let (_root, repo) = temp_repo();
        assert!(matches!(
            repo.create_user("a").expect_err("too short"),
            AppError::Validation { .. }
        ));
        assert!(matches!(
            repo.create_user(&"x".repeat(51)).expect_err("too long"),
            AppError::Validation { .. }
        ));

        let user = repo.create_user("  Al  ").expect("create user");
        assert_eq!(user.user_name, "Al");
        assert!(user.user_id.starts_with("user_"));
        assert!(!user.created_at.is_empty());
    }

    #[test]
    fn submit_score_requires_truthy_identity_mode_and_score() {
        let (_root, repo) = temp_repo();
        let error = repo
            .submit_score(&json!({"userName": "A", "mode": "technical", "score": 0}))
            .expect_err("must reject");
        match error {
            AppError::Validation { fields } => {
                assert_eq!(fields, vec!["userId".to_string(), "score".to_string()]);
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn submit_score_coerces_numeric_strings() {
        let (_root, repo) = temp_repo();
        let entry = repo
            .submit_score(&json!({
                "userId": "u1",
                "userName": "A",
                "mode": "technical",
                "score": "10",
                "accuracy": "91.5",
            }))
            .expect("submit");
        assert_eq!(entry.score, 10);
        assert_eq!(entry.accuracy, 91.5);
        assert_eq!(entry.questions_attempted, 0);
        assert!(!entry.timestamp.is_empty(), "timestamp must be assigned");
    }

    #[test]
    fn submit_score_rejects_non_numeric_coercion() {
        let (_root, repo) = temp_repo();
        let mut payload = score_payload("u1", "A", "technical", 10);
        payload["duration"] = json!("ninety");
        let error = repo.submit_score(&payload).expect_err("must reject");
        match error {
            AppError::Validation { fields } => {
                assert_eq!(fields, vec!["duration (must be numeric)".to_string()]);
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn submissions_append_and_overwrite_user_name() {
        let (_root, repo) = temp_repo();
        repo.submit_score(&score_payload("u1", "A", "technical", 10))
            .expect("first submit");
        repo.submit_score(&score_payload("u1", "A2", "technical", 5))
            .expect("second submit");

        let rows = repo.query("technical", 0).expect("query");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.user_name == "A2"));
        assert_eq!(rows[0].entry.score, 10);
        assert_eq!(rows[1].entry.score, 5);
    }

    #[test]
    fn query_filters_by_mode_and_truncates() {
        let (_root, repo) = temp_repo();
        repo.submit_score(&score_payload("u1", "A", "technical", 10))
            .expect("submit");
        repo.submit_score(&score_payload("u2", "B", "memory", 20))
            .expect("submit");
        repo.submit_score(&score_payload("u3", "C", "technical", 30))
            .expect("submit");

        let all = repo.query("all", 0).expect("query all");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].entry.score, 30);

        // Request-side mode strings are lowercased before comparison.
        let technical = repo.query("Technical", 0).expect("query technical");
        assert_eq!(technical.len(), 2);

        let top_one = repo.query("all", 1).expect("query limited");
        assert_eq!(top_one.len(), 1);
        assert_eq!(top_one[0].user_id, "u3");
    }

    #[test]
    fn query_keeps_encounter_order_on_tied_scores() {
        let (_root, repo) = temp_repo();
        repo.submit_score(&score_payload("u1", "A", "technical", 10))
            .expect("submit");
        repo.submit_score(&score_payload("u2", "B", "technical", 10))
            .expect("submit");
        let rows = repo.query("technical", 0).expect("query");
        assert_eq!(rows[0].user_id, "u1");
        assert_eq!(rows[1].user_id, "u2");
    }
}
