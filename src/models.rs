use serde::{Deserialize, Serialize};

/// Optional geolocation attached to a reflection. All fields are stored as
/// strings because the client submits them straight from form inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub lat: String,
    pub lon: String,
    pub address: String,
}

/// One journal entry. `timestamp` is the unique identity: assigned at
/// creation when the client did not supply one, never reassigned afterwards,
/// and the only key accepted by update/delete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReflectionEntry {
    pub week: String,
    pub title: String,
    pub date: String,
    pub task_name: String,
    pub reflection: String,
    pub location: Location,
    pub tech: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub user_name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreEntry {
    pub mode: String,
    pub score: i64,
    pub questions_attempted: i64,
    pub correct_answers: i64,
    pub accuracy: f64,
    pub timestamp: String,
    pub duration: i64,
}

/// At most one record per `user_id`; submissions append to `entries` and
/// overwrite `user_name` (last write wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardUser {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub entries: Vec<ScoreEntry>,
}

/// Query result shape: a score entry annotated with its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub user_id: String,
    pub user_name: String,
    #[serde(flatten)]
    pub entry: ScoreEntry,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersDocument {
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardDocument {
    pub leaderboard: Vec<LeaderboardUser>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    Technical,
    Memory,
    WordScramble,
    Reflection,
}

impl QuizMode {
    pub const ALL: [QuizMode; 4] = [
        Self::Technical,
        Self::Memory,
        Self::WordScramble,
        Self::Reflection,
    ];

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "technical" => Some(Self::Technical),
            "memory" => Some(Self::Memory),
            "wordscramble" => Some(Self::WordScramble),
            "reflection" => Some(Self::Reflection),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Memory => "memory",
            Self::WordScramble => "wordscramble",
            Self::Reflection => "reflection",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Technical => "technical_quizzes.json",
            Self::Memory => "memory_match.json",
            Self::WordScramble => "word_scramble.json",
            Self::Reflection => "reflection_puzzles.json",
        }
    }

    /// Fixed top-level key each quiz content document exposes its items under.
    pub fn document_key(self) -> &'static str {
        match self {
            Self::Technical => "technicalQuizzes",
            Self::Memory => "memoryMatch",
            Self::WordScramble => "wordScramble",
            Self::Reflection => "reflectionPuzzle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_mode_parses_case_insensitively() {
        assert_eq!(QuizMode::parse("Technical"), Some(QuizMode::Technical));
        assert_eq!(QuizMode::parse("WORDSCRAMBLE"), Some(QuizMode::WordScramble));
        assert_eq!(QuizMode::parse(" memory "), Some(QuizMode::Memory));
        assert_eq!(QuizMode::parse("trivia"), None);
    }

    #[test]
    fn reflection_entry_uses_camel_case_wire_names() {
        let entry = ReflectionEntry {
            week: "1".to_string(),
            title: "Week 1 recap".to_string(),
            date: "2024-01-01".to_string(),
            task_name: "setup".to_string(),
            reflection: "went fine".to_string(),
            location: Location::default(),
            tech: vec!["rust".to_string()],
            timestamp: "2024-01-01T10:00:00+00:00".to_string(),
        };
        let value = serde_json::to_value(&entry).expect("serialize entry");
        assert_eq!(value["taskName"], "setup");
        assert!(value.get("task_name").is_none());

        let back: ReflectionEntry = serde_json::from_value(value).expect("deserialize entry");
        assert_eq!(back, entry);
    }

    #[test]
    fn leaderboard_row_flattens_entry_fields() {
        let row = LeaderboardRow {
            user_id: "user_1".to_string(),
            user_name: "A".to_string(),
            entry: ScoreEntry {
                mode: "technical".to_string(),
                score: 10,
                ..ScoreEntry::default()
            },
        };
        let value = serde_json::to_value(&row).expect("serialize row");
        assert_eq!(value["userId"], "user_1");
        assert_eq!(value["score"], 10);
    }

    #[test]
    fn partial_documents_fill_defaults() {
        let entry: ReflectionEntry =
            serde_json::from_str(r#"{"title": "only a title"}"#).expect("partial entry");
        assert_eq!(entry.title, "only a title");
        assert!(entry.tech.is_empty());
        assert_eq!(entry.location, Location::default());
    }
}
