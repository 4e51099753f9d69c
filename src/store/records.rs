//! Generic record repository over a MongoDB collection or an in-memory vector.
//!
//! `Records<T>` is an enum, like `LlmProvider`: adding a backend means a new
//! variant and a new arm per method. Handles are cheap to clone; clones share
//! the same collection (or the same vector).

use std::sync::Arc;

use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Collection, Database};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::AppError;

use super::query::{FieldCount, ListQuery, Page};

/// Field every record carries; lists are newest first on it.
const SORT_FIELD: &str = "createdAt";
/// Bucket name for records where a counted field is missing or null.
const UNSPECIFIED: &str = "unspecified";

/// A document type stored by [`Records`].
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    /// Collection name in MongoDB.
    const COLLECTION: &'static str;
    /// Fields searched by the `search` query parameter.
    const SEARCH_FIELDS: &'static [&'static str];
    /// Categorical fields accepted as equality filters.
    const FILTER_FIELDS: &'static [&'static str];

    fn id(&self) -> &str;
}

pub enum Records<T: Record> {
    Mongo(Collection<T>),
    Memory(Arc<RwLock<Vec<T>>>),
}

impl<T: Record> Clone for Records<T> {
    fn clone(&self) -> Self {
        match self {
            Records::Mongo(c) => Records::Mongo(c.clone()),
            Records::Memory(v) => Records::Memory(Arc::clone(v)),
        }
    }
}

fn to_json<T: Serialize>(record: &T) -> Result<Value, AppError> {
    serde_json::to_value(record).map_err(|e| AppError::Database(format!("serialise record: {e}")))
}

impl<T: Record> Records<T> {
    pub fn mongo(db: &Database) -> Self {
        Records::Mongo(db.collection::<T>(T::COLLECTION))
    }

    pub fn memory() -> Self {
        Records::Memory(Arc::new(RwLock::new(Vec::new())))
    }

    pub async fn insert(&self, record: &T) -> Result<(), AppError> {
        match self {
            Records::Mongo(c) => {
                c.insert_one(record).await?;
            }
            Records::Memory(v) => {
                let mut items = v.write().await;
                if items.iter().any(|r| r.id() == record.id()) {
                    return Err(AppError::Conflict(format!("duplicate id {}", record.id())));
                }
                items.push(record.clone());
            }
        }
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, AppError> {
        match self {
            Records::Mongo(c) => Ok(c.find_one(doc! { "_id": id }).await?),
            Records::Memory(v) => Ok(v.read().await.iter().find(|r| r.id() == id).cloned()),
        }
    }

    /// First record whose `field` equals `value`.
    pub async fn find_one_by(&self, field: &str, value: &str) -> Result<Option<T>, AppError> {
        match self {
            Records::Mongo(c) => {
                let mut filter = Document::new();
                filter.insert(field, value);
                Ok(c.find_one(filter).await?)
            }
            Records::Memory(v) => {
                let query = ListQuery::default().with_filter(field, value);
                for record in v.read().await.iter() {
                    if query.matches(&to_json(record)?, &[], None) {
                        return Ok(Some(record.clone()));
                    }
                }
                Ok(None)
            }
        }
    }

    pub async fn count_where(&self, field: &str, value: &str) -> Result<u64, AppError> {
        match self {
            Records::Mongo(c) => {
                let mut filter = Document::new();
                filter.insert(field, value);
                Ok(c.count_documents(filter).await?)
            }
            Records::Memory(v) => {
                let query = ListQuery::default().with_filter(field, value);
                let mut n = 0;
                for record in v.read().await.iter() {
                    if query.matches(&to_json(record)?, &[], None) {
                        n += 1;
                    }
                }
                Ok(n)
            }
        }
    }

    pub async fn count_all(&self) -> Result<u64, AppError> {
        match self {
            Records::Mongo(c) => Ok(c.count_documents(doc! {}).await?),
            Records::Memory(v) => Ok(v.read().await.len() as u64),
        }
    }

    /// Every record, unpaginated. Used for small banks that are scored in memory.
    pub async fn all(&self) -> Result<Vec<T>, AppError> {
        match self {
            Records::Mongo(c) => Ok(c.find(doc! {}).await?.try_collect().await?),
            Records::Memory(v) => Ok(v.read().await.clone()),
        }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<T>, AppError> {
        match self {
            Records::Mongo(c) => {
                let filter = query.to_filter(T::SEARCH_FIELDS);
                let total = c.count_documents(filter.clone()).await?;
                let items: Vec<T> = c
                    .find(filter)
                    .sort(doc! { "createdAt": -1 })
                    .skip(query.skip)
                    .limit(query.limit)
                    .await?
                    .try_collect()
                    .await?;
                Ok(Page { items, total, skip: query.skip, limit: query.limit })
            }
            Records::Memory(v) => {
                let matcher = query.search_matcher();
                let mut hits: Vec<(String, T)> = Vec::new();
                for record in v.read().await.iter() {
                    let json = to_json(record)?;
                    if query.matches(&json, T::SEARCH_FIELDS, matcher.as_ref()) {
                        let key = json.get(SORT_FIELD).and_then(Value::as_str).unwrap_or_default().to_string();
                        hits.push((key, record.clone()));
                    }
                }
                hits.sort_by(|a, b| b.0.cmp(&a.0));
                let total = hits.len() as u64;
                let items = hits
                    .into_iter()
                    .skip(query.skip as usize)
                    .take(query.limit.max(0) as usize)
                    .map(|(_, r)| r)
                    .collect();
                Ok(Page { items, total, skip: query.skip, limit: query.limit })
            }
        }
    }

    /// Replace the stored record with the same id. `false` when absent.
    pub async fn replace(&self, record: &T) -> Result<bool, AppError> {
        match self {
            Records::Mongo(c) => {
                let result = c.replace_one(doc! { "_id": record.id() }, record).await?;
                Ok(result.matched_count > 0)
            }
            Records::Memory(v) => {
                let mut items = v.write().await;
                match items.iter_mut().find(|r| r.id() == record.id()) {
                    Some(slot) => {
                        *slot = record.clone();
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }

    /// Delete by id. `false` when absent.
    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        match self {
            Records::Mongo(c) => Ok(c.delete_one(doc! { "_id": id }).await?.deleted_count > 0),
            Records::Memory(v) => {
                let mut items = v.write().await;
                let before = items.len();
                items.retain(|r| r.id() != id);
                Ok(items.len() < before)
            }
        }
    }

    /// Count records grouped by `field`, largest group first.
    pub async fn count_by(&self, field: &str) -> Result<Vec<FieldCount>, AppError> {
        let mut counts = match self {
            Records::Mongo(c) => {
                let pipeline = vec![doc! { "$group": { "_id": format!("${field}"), "count": { "$sum": 1 } } }];
                let rows: Vec<Document> = c.aggregate(pipeline).await?.try_collect().await?;
                rows.iter()
                    .map(|row| FieldCount {
                        value: match row.get("_id") {
                            Some(Bson::String(s)) => s.clone(),
                            Some(Bson::Null) | None => UNSPECIFIED.to_string(),
                            Some(other) => other.to_string(),
                        },
                        count: match row.get("count") {
                            Some(Bson::Int32(n)) => *n as u64,
                            Some(Bson::Int64(n)) => *n as u64,
                            _ => 0,
                        },
                    })
                    .collect::<Vec<_>>()
            }
            Records::Memory(v) => {
                let mut tally: std::collections::BTreeMap<String, u64> = Default::default();
                for record in v.read().await.iter() {
                    let key = match to_json(record)?.get(field) {
                        Some(Value::String(s)) => s.clone(),
                        Some(Value::Null) | None => UNSPECIFIED.to_string(),
                        Some(other) => other.to_string(),
                    };
                    *tally.entry(key).or_default() += 1;
                }
                tally.into_iter().map(|(value, count)| FieldCount { value, count }).collect()
            }
        };
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
        Ok(counts)
    }
}
