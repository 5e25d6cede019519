//! Storage port for villas, leads and reviews.
//!
//! Two implementations sit behind [`VillaStore`]: [`PostgresStore`] for the
//! hosted database and [`LocalStore`] as the local fallback. The choice is
//! made once in [`build_store`]; handlers only see the trait object.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::{
    config::{AppConfig, StorageBackend},
    models::{Lead, LeadPatch, NewLead, NewReview, NewVilla, Review, Villa, VillaPatch},
};

pub mod local;
pub mod postgres;
pub mod seed;
pub mod table_service;

pub use local::LocalStore;
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} record not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreTable {
    Villas,
    Leads,
    Reviews,
}

impl StoreTable {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Villas => "villas",
            Self::Leads => "leads",
            Self::Reviews => "reviews",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "villas" => Some(Self::Villas),
            "leads" => Some(Self::Leads),
            "reviews" => Some(Self::Reviews),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreAction {
    Insert,
    Update,
    Delete,
}

impl StoreAction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Change notification published after every committed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreEvent {
    pub table: StoreTable,
    pub action: StoreAction,
    pub id: String,
}

impl StoreEvent {
    pub fn new(table: StoreTable, action: StoreAction, id: &str) -> Self {
        Self {
            table,
            action,
            id: id.to_string(),
        }
    }
}

pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 256;

#[async_trait]
pub trait VillaStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn list_villas(&self) -> StoreResult<Vec<Villa>>;
    async fn get_villa(&self, id: &str) -> StoreResult<Villa>;
    async fn create_villa(&self, input: NewVilla) -> StoreResult<Villa>;
    async fn update_villa(&self, id: &str, patch: VillaPatch) -> StoreResult<Villa>;
    async fn delete_villa(&self, id: &str) -> StoreResult<()>;

    async fn list_leads(&self) -> StoreResult<Vec<Lead>>;
    async fn create_lead(&self, input: NewLead) -> StoreResult<Lead>;
    async fn update_lead(&self, id: &str, patch: LeadPatch) -> StoreResult<Lead>;
    async fn delete_lead(&self, id: &str) -> StoreResult<()>;

    async fn list_reviews(&self, villa_id: Option<&str>) -> StoreResult<Vec<Review>>;
    async fn create_review(&self, input: NewReview) -> StoreResult<Review>;
    /// Sets approval and folds the score into (or out of) the villa rating
    /// as one write. Repeating the current decision changes nothing.
    async fn moderate_review(&self, id: &str, approved: bool) -> StoreResult<Review>;
    /// Removes a review. An approved one is unfolded from the villa rating
    /// in the same write.
    async fn delete_review(&self, id: &str) -> StoreResult<()>;

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Picks the storage implementation for this process.
pub async fn build_store(config: &AppConfig) -> Arc<dyn VillaStore> {
    if config.storage_backend == StorageBackend::Postgres {
        match connect_postgres(config).await {
            Ok(store) => return Arc::new(store),
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "Postgres store unavailable, falling back to local storage"
                );
            }
        }
    }

    let local = match config.local_store_path.as_deref() {
        Some(path) => LocalStore::open(path, config.seed_demo_data)
            .await
            .unwrap_or_else(|error| {
                tracing::error!(
                    error = %error,
                    path,
                    "Could not open local store file, keeping data in memory only"
                );
                LocalStore::in_memory(seed_villas(config))
            }),
        None => LocalStore::in_memory(seed_villas(config)),
    };
    Arc::new(local)
}

async fn connect_postgres(config: &AppConfig) -> StoreResult<PostgresStore> {
    let url = config.database_url.as_deref().ok_or_else(|| {
        StoreError::Invalid("DATABASE_URL is required for the postgres backend.".to_string())
    })?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_pool_max_connections)
        .min_connections(config.db_pool_min_connections)
        .acquire_timeout(Duration::from_secs(config.db_pool_acquire_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.db_pool_idle_timeout_seconds))
        .connect(url)
        .await?;

    let store = PostgresStore::new(pool);
    store.ensure_schema().await?;
    if config.seed_demo_data {
        store.seed_if_empty(seed::demo_villas()).await?;
    }
    store.spawn_change_listener();
    Ok(store)
}

fn seed_villas(config: &AppConfig) -> Vec<Villa> {
    if config.seed_demo_data {
        seed::demo_villas()
    } else {
        Vec::new()
    }
}
