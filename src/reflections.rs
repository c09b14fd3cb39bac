use crate::errors::{AppError, AppResult};
use crate::models::{Location, ReflectionEntry};
use crate::store::JsonStore;
use chrono::Utc;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of normalizing a loosely-typed client payload. The entry itself is
/// always fully populated; `tech_is_list` records whether the raw `tech`
/// value was actually an array, so validation can flag it.
#[derive(Debug, Clone)]
pub struct DraftEntry {
    pub entry: ReflectionEntry,
    tech_is_list: bool,
}

impl DraftEntry {
    /// Advisory validation: returns every missing or invalid field, never
    /// errors. The caller decides whether to reject.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = required_field_problems(&self.entry);
        if !self.tech_is_list {
            problems.push("tech (must be a list)".to_string());
        }
        problems
    }
}

fn required_field_problems(entry: &ReflectionEntry) -> Vec<String> {
    [
        ("week", &entry.week),
        ("title", &entry.title),
        ("date", &entry.date),
        ("taskName", &entry.task_name),
        ("reflection", &entry.reflection),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(name, _)| name.to_string())
    .collect()
}

/// Stringifies and trims a scalar payload value. Missing values, nulls, and
/// non-scalar values read as the empty string.
fn trimmed_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

/// First non-empty value among the aliased keys, trimmed.
fn first_trimmed(payload: &Value, keys: &[&str]) -> String {
    for key in keys {
        let text = trimmed_string(payload.get(key));
        if !text.is_empty() {
            return text;
        }
    }
    String::new()
}

fn normalize_location(value: Option<&Value>) -> Location {
    match value {
        Some(Value::Object(map)) => Location {
            lat: trimmed_string(map.get("lat")),
            lon: trimmed_string(map.get("lon")),
            address: trimmed_string(map.get("address")),
        },
        _ => Location::default(),
    }
}

fn tag_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Extracts a reflection entry from a loosely-typed payload: `title` falls
/// back to `journalName`, `reflection` falls back to `taskDescription`,
/// strings are trimmed, `location` defaults to the empty triple, and a
/// missing `timestamp` is assigned from the current UTC time.
pub fn normalize_entry(payload: &Value) -> DraftEntry {
    let (tech, tech_is_list) = match payload.get("tech") {
        None | Some(Value::Null) => (Vec::new(), true),
        Some(Value::Array(items)) => (items.iter().map(tag_string).collect(), true),
        Some(_) => (Vec::new(), false),
    };

    let mut timestamp = trimmed_string(payload.get("timestamp"));
    if timestamp.is_empty() {
        timestamp = Utc::now().to_rfc3339();
    }

    let entry = ReflectionEntry {
        week: trimmed_string(payload.get("week")),
        title: first_trimmed(payload, &["title", "journalName"]),
        date: trimmed_string(payload.get("date")),
        task_name: trimmed_string(payload.get("taskName")),
        reflection: first_trimmed(payload, &["reflection", "taskDescription"]),
        location: normalize_location(payload.get("location")),
        tech,
        timestamp,
    };

    DraftEntry { entry, tech_is_list }
}

/// Recognized fields extracted from an update payload. Anything outside the
/// allowed set is ignored; `tech` must be an array when present.
#[derive(Debug, Default)]
struct EntryUpdates {
    week: Option<String>,
    title: Option<String>,
    date: Option<String>,
    task_name: Option<String>,
    reflection: Option<String>,
    tech: Option<Vec<String>>,
    location: Option<Location>,
}

impl EntryUpdates {
    fn from_payload(payload: &Value) -> AppResult<Self> {
        let mut updates = Self::default();
        for (field, slot) in [
            ("week", &mut updates.week),
            ("title", &mut updates.title),
            ("date", &mut updates.date),
            ("taskName", &mut updates.task_name),
            ("reflection", &mut updates.reflection),
        ] {
            if let Some(value) = payload.get(field) {
                *slot = Some(trimmed_string(Some(value)));
            }
        }
        match payload.get("tech") {
            None => {}
            Some(Value::Array(items)) => {
                updates.tech = Some(items.iter().map(tag_string).collect());
            }
            Some(_) => return Err(AppError::validation("tech (must be a list)")),
        }
        if let Some(value) = payload.get("location") {
            updates.location = Some(normalize_location(Some(value)));
        }
        if updates.is_empty() {
            return Err(AppError::validation("update (no recognized fields)"));
        }
        Ok(updates)
    }

    fn is_empty(&self) -> bool {
        self.week.is_none()
            && self.title.is_none()
            && self.date.is_none()
            && self.task_name.is_none()
            && self.reflection.is_none()
            && self.tech.is_none()
            && self.location.is_none()
    }

    fn apply(self, entry: &mut ReflectionEntry) {
        if let Some(week) = self.week {
            entry.week = week;
        }
        if let Some(title) = self.title {
            entry.title = title;
        }
        if let Some(date) = self.date {
            entry.date = date;
        }
        if let Some(task_name) = self.task_name {
            entry.task_name = task_name;
        }
        if let Some(reflection) = self.reflection {
            entry.reflection = reflection;
        }
        if let Some(tech) = self.tech {
            entry.tech = tech;
        }
        if let Some(location) = self.location {
            entry.location = location;
        }
    }
}

fn sort_key(entry: &ReflectionEntry) -> &str {
    if entry.date.is_empty() {
        &entry.timestamp
    } else {
        &entry.date
    }
}

/// Newest first: descending by date, falling back to the timestamp identity
/// when no date is set. Stable, so equal keys keep their stored order.
fn sort_newest_first(entries: &mut [ReflectionEntry]) {
    entries.sort_by(|a, b| sort_key(b).cmp(sort_key(a)));
}

/// CRUD and search over the reflections document.
#[derive(Debug)]
pub struct ReflectionRepository {
    store: Arc<JsonStore>,
    path: PathBuf,
}

impl ReflectionRepository {
    pub fn new(store: Arc<JsonStore>, path: PathBuf) -> Self {
        Self { store, path }
    }

    fn load(&self) -> AppResult<Vec<ReflectionEntry>> {
        self.store.read(&self.path, Vec::new())
    }

    pub fn list(&self) -> AppResult<Vec<ReflectionEntry>> {
        let mut entries = self.load()?;
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    pub fn create(&self, payload: &Value) -> AppResult<ReflectionEntry> {
        let draft = normalize_entry(payload);
        let problems = draft.problems();
        if !problems.is_empty() {
            return Err(AppError::Validation { fields: problems });
        }

        let _guard = self.store.write_guard();
        let mut entries = self.load()?;
        entries.push(draft.entry.clone());
        self.store.write(&self.path, &entries)?;
        tracing::debug!(timestamp = %draft.entry.timestamp, "reflection created");
        Ok(draft.entry)
    }

    pub fn update(&self, timestamp: &str, payload: &Value) -> AppResult<ReflectionEntry> {
        let updates = EntryUpdates::from_payload(payload)?;

        let _guard = self.store.write_guard();
        let mut entries = self.load()?;
        let Some(index) = entries.iter().position(|entry| entry.timestamp == timestamp) else {
            return Err(AppError::NotFound(format!(
                "no reflection with timestamp {timestamp}"
            )));
        };

        let mut merged = entries[index].clone();
        updates.apply(&mut merged);
        let problems = required_field_problems(&merged);
        if !problems.is_empty() {
            return Err(AppError::Validation { fields: problems });
        }

        entries[index] = merged.clone();
        self.store.write(&self.path, &entries)?;
        Ok(merged)
    }

    pub fn delete(&self, timestamp: &str) -> AppResult<()> {
        let _guard = self.store.write_guard();
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|entry| entry.timestamp != timestamp);
        if entries.len() == before {
            return Err(AppError::NotFound(format!(
                "no reflection with timestamp {timestamp}"
            )));
        }
        self.store.write(&self.path, &entries)
    }

    /// Filters are AND-combined: `query` is a case-insensitive substring
    /// match over title, task name, and reflection text; `week` is exact;
    /// `tech` must appear verbatim among the entry's tags.
    pub fn search(
        &self,
        query: Option<&str>,
        week: Option<&str>,
        tech: Option<&str>,
    ) -> AppResult<Vec<ReflectionEntry>> {
        let query = query
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());
        let week = week.map(str::trim).filter(|value| !value.is_empty());
        let tech = tech.map(str::trim).filter(|value| !value.is_empty());

        let mut entries = self.load()?;
        entries.retain(|entry| {
            if let Some(needle) = query.as_deref() {
                let haystack = format!(
                    "{} {} {}",
                    entry.title, entry.task_name, entry.reflection
                )
                .to_lowercase();
                if !haystack.contains(needle) {
                    return false;
                }
            }
            if let Some(week) = week {
                if entry.week != week {
                    return false;
                }
            }
            if let Some(tech) = tech {
                if !entry.tech.iter().any(|tag| tag == tech) {
                    return false;
                }
            }
            true
        });
        sort_newest_first(&mut entries);
        Ok(entries)
    }
}
