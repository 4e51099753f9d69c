//! Persistence layer.
//!
//! - **records**: generic `Records<T>` repository (MongoDB or in-memory).
//! - **query**: list queries, pages and count-by rows.
//! - **users**: `UserService`: accounts, credentials, gamification.
//! - **content**: `ContentService<T>` over past papers, homework, question videos.
//! - **topic_vault**: `TopicVaultService`: lesson catalogue with stats and seeding.
//! - **models**: content record shapes.

pub mod content;
pub mod models;
pub mod query;
pub mod records;
pub mod topic_vault;
pub mod users;

use mongodb::bson::doc;
use mongodb::{Client, Database};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::error::AppError;

pub use query::{FieldCount, ListQuery, Page};
pub use records::{Record, Records};

/// Where repositories keep their records.
#[derive(Clone)]
pub enum Backend {
    Mongo(Database),
    Memory,
}

impl Backend {
    /// Connect to MongoDB when a URI is configured; fall back to memory otherwise.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let Some(uri) = config.uri.as_deref() else {
            warn!("MONGODB_URI not set, using in-memory repositories (data is lost on exit)");
            return Ok(Backend::Memory);
        };

        let client = Client::with_uri_str(uri).await?;
        let db = client.database(&config.db_name);
        db.run_command(doc! { "ping": 1 }).await?;
        info!(db_name = %config.db_name, "connected to MongoDB");
        Ok(Backend::Mongo(db))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Mongo(_) => "mongodb",
            Backend::Memory => "memory",
        }
    }

    /// Repository handle for `T`. Each memory handle owns a fresh, empty vector,
    /// so call this once per record type and share the result.
    pub fn records<T: Record>(&self) -> Records<T> {
        match self {
            Backend::Mongo(db) => Records::mongo(db),
            Backend::Memory => Records::memory(),
        }
    }
}
