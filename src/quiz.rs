use crate::errors::AppResult;
use crate::models::QuizMode;
use crate::store::{DataPaths, JsonStore};
use serde_json::Value;
use std::sync::Arc;

/// Empty quiz document for a mode: `{"<key>": []}`.
pub fn empty_quiz_doc(mode: QuizMode) -> Value {
    let mut doc = serde_json::Map::new();
    doc.insert(mode.document_key().to_string(), Value::Array(Vec::new()));
    Value::Object(doc)
}

/// Read-only passthrough over the externally supplied quiz content
/// documents. An absent document is initialized to its empty default;
/// existing content is never mutated.
#[derive(Debug)]
pub struct QuizContent {
    store: Arc<JsonStore>,
    paths: DataPaths,
}

impl QuizContent {
    pub fn new(store: Arc<JsonStore>, paths: DataPaths) -> Self {
        Self { store, paths }
    }

    /// Items under the mode's fixed top-level key, empty when the key is
    /// absent or the document is malformed.
    pub fn questions(&self, mode: QuizMode) -> AppResult<Vec<Value>> {
        let doc: Value = self
            .store
            .read(&self.paths.quiz(mode), empty_quiz_doc(mode))?;
        Ok(doc
            .get(mode.document_key())
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}
