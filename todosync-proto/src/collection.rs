//! In-memory `/todos` resource collection.
//!
//! Implements the REST semantics the client relies on: creation fills in
//! defaults and assigns an id, updates merge the submitted fields over the
//! stored record, and lookups by id compare the id's text form, so `"/todos/7"`
//! finds both `7` and `"7"`. Used by the mock backend and by the client's
//! in-process transport. Not thread-safe on its own; callers wrap it in a lock.

use serde_json::{Map, Value};
use uuid::Uuid;

/// Errors returned by collection operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    /// No record has the requested id.
    #[error("todo not found: {0}")]
    NotFound(String),
    /// The request body is not a JSON object.
    #[error("invalid body: {0}")]
    InvalidBody(String),
}

impl CollectionError {
    /// HTTP status code a REST front end should answer with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidBody(_) => 400,
        }
    }
}

/// Ordered collection of todo records stored as JSON objects.
#[derive(Debug, Clone, Default)]
pub struct TodoCollection {
    records: Vec<Map<String, Value>>,
}

impl TodoCollection {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Returns every record in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<Value> {
        self.records.iter().cloned().map(Value::Object).collect()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the collection holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up one record by the text form of its id.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::NotFound`] if no record matches.
    pub fn get(&self, id: &str) -> Result<Value, CollectionError> {
        self.position(id)
            .map(|index| Value::Object(self.records[index].clone()))
            .ok_or_else(|| CollectionError::NotFound(id.to_string()))
    }

    /// Stores a new record and returns it with its id and defaults.
    ///
    /// Missing fields get `completed: false`, `dueDate: null`,
    /// `description: ""` and `checklist: []`. A body without an `id` gets a
    /// fresh UUID.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::InvalidBody`] if `body` is not an object.
    pub fn create(&mut self, body: Value) -> Result<Value, CollectionError> {
        let Value::Object(fields) = body else {
            return Err(CollectionError::InvalidBody(
                "expected a JSON object".to_string(),
            ));
        };

        let mut record = Map::new();
        record.insert("id".to_string(), Value::String(Uuid::now_v7().to_string()));
        record.insert("completed".to_string(), Value::Bool(false));
        record.insert("dueDate".to_string(), Value::Null);
        record.insert("description".to_string(), Value::String(String::new()));
        record.insert("checklist".to_string(), Value::Array(Vec::new()));
        record.extend(fields);

        self.records.push(record.clone());
        Ok(Value::Object(record))
    }

    /// Merges `body` over the stored record and returns the result.
    ///
    /// The stored id is kept even if the body carries a different one.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::NotFound`] for an unknown id, or
    /// [`CollectionError::InvalidBody`] if `body` is not an object.
    pub fn update(&mut self, id: &str, body: Value) -> Result<Value, CollectionError> {
        let Value::Object(fields) = body else {
            return Err(CollectionError::InvalidBody(
                "expected a JSON object".to_string(),
            ));
        };
        let index = self
            .position(id)
            .ok_or_else(|| CollectionError::NotFound(id.to_string()))?;

        let record = &mut self.records[index];
        let stored_id = record.get("id").cloned();
        record.extend(fields);
        if let Some(stored_id) = stored_id {
            record.insert("id".to_string(), stored_id);
        }
        Ok(Value::Object(record.clone()))
    }

    /// Removes a record.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::NotFound`] for an unknown id.
    pub fn delete(&mut self, id: &str) -> Result<(), CollectionError> {
        let index = self
            .position(id)
            .ok_or_else(|| CollectionError::NotFound(id.to_string()))?;
        self.records.remove(index);
        Ok(())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.get("id").is_some_and(|stored| id_matches(stored, id)))
    }
}

fn id_matches(stored: &Value, id: &str) -> bool {
    match stored {
        Value::String(s) => s == id,
        Value::Number(n) => n.to_string() == id,
        _ => false,
    }
}
