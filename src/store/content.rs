//! Generic CRUD service for content records.
//!
//! Request bodies arrive as loose JSON. `create_from_json` stamps a fresh id
//! and timestamps before typing the document; `update_from_json` merges the
//! given top-level fields over the stored record, keeping its id and
//! `createdAt`.

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::AppError;

use super::models::ContentRecord;
use super::query::{FieldCount, ListQuery, Page};
use super::records::Records;

/// Fields a client may not set or overwrite.
const PROTECTED_FIELDS: &[&str] = &["_id", "id", "createdAt", "updatedAt"];

pub struct ContentService<T: ContentRecord> {
    records: Records<T>,
}

impl<T: ContentRecord> Clone for ContentService<T> {
    fn clone(&self) -> Self {
        Self { records: self.records.clone() }
    }
}

fn object(body: Value) -> Result<Map<String, Value>, AppError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::validation("request body must be a JSON object")),
    }
}

fn timestamp() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

fn typed<T: ContentRecord>(fields: Map<String, Value>) -> Result<T, AppError> {
    let record: T = serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::validation(format!("invalid {}: {e}", T::KIND)))?;
    record.validate()?;
    Ok(record)
}

impl<T: ContentRecord> ContentService<T> {
    pub fn new(records: Records<T>) -> Self {
        Self { records }
    }

    pub async fn create_from_json(&self, body: Value) -> Result<T, AppError> {
        let mut fields = object(body)?;
        for f in PROTECTED_FIELDS {
            fields.remove(*f);
        }
        let now = timestamp();
        fields.insert("_id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
        fields.insert("createdAt".into(), now.clone());
        fields.insert("updatedAt".into(), now);

        let record = typed::<T>(fields)?;
        self.records.insert(&record).await?;
        debug!(kind = T::KIND, id = record.id(), "content record created");
        Ok(record)
    }

    pub async fn update_from_json(&self, id: &str, body: Value) -> Result<T, AppError> {
        let patch = object(body)?;
        let current = self.get(id).await?;

        let mut fields = object(
            serde_json::to_value(&current).map_err(|e| AppError::Database(format!("serialise {}: {e}", T::KIND)))?,
        )?;
        for (key, value) in patch {
            if !PROTECTED_FIELDS.contains(&key.as_str()) {
                fields.insert(key, value);
            }
        }
        fields.insert("updatedAt".into(), timestamp());

        let record = typed::<T>(fields)?;
        if !self.records.replace(&record).await? {
            return Err(AppError::not_found(format!("{} {id}", T::KIND)));
        }
        debug!(kind = T::KIND, %id, "content record updated");
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<T, AppError> {
        self.records
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("{} {id}", T::KIND)))
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<T>, AppError> {
        self.records.list(query).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if !self.records.delete(id).await? {
            return Err(AppError::not_found(format!("{} {id}", T::KIND)));
        }
        debug!(kind = T::KIND, %id, "content record deleted");
        Ok(())
    }

    pub async fn count_by(&self, field: &str) -> Result<Vec<FieldCount>, AppError> {
        self.records.count_by(field).await
    }

    pub async fn count_all(&self) -> Result<u64, AppError> {
        self.records.count_all().await
    }

    /// Insert `defaults` when the collection is empty. Returns how many were written.
    pub async fn seed_if_empty(&self, defaults: Vec<T>) -> Result<usize, AppError> {
        if self.records.count_all().await? > 0 {
            return Ok(0);
        }
        for record in &defaults {
            self.records.insert(record).await?;
        }
        info!(kind = T::KIND, count = defaults.len(), "seeded empty collection");
        Ok(defaults.len())
    }
}
