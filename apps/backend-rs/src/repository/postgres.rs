use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;

use super::{
    new_id,
    table_service::{
        create_row, delete_row, delete_row_tx, get_row, list_rows, lock_row_tx, update_row,
        update_row_tx,
    },
    StoreAction, StoreError, StoreEvent, StoreResult, StoreTable, VillaStore,
    EVENT_CHANNEL_CAPACITY,
};
use crate::{
    models::{Lead, LeadPatch, LeadStatus, NewLead, NewReview, NewVilla, Review, Villa, VillaPatch},
    services::reviews::rating_patch,
};

const SCHEMA_SQL: &str = include_str!("../../migrations/0001_init.sql");
const CHANGE_CHANNEL: &str = "store_changes";
const LISTENER_RETRY: Duration = Duration::from_secs(5);

/// Hosted-database store. Change events come from the `store_changes`
/// notification channel while the listener is connected, so writes made by
/// other instances are seen too.
pub struct PostgresStore {
    pool: sqlx::PgPool,
    events: broadcast::Sender<StoreEvent>,
    listener_active: Arc<AtomicBool>,
}

impl PostgresStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            pool,
            events,
            listener_active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn seed_if_empty(&self, villas: Vec<Villa>) -> StoreResult<()> {
        if !self.list_villas().await?.is_empty() {
            return Ok(());
        }
        let total = villas.len();
        for villa in villas {
            create_row(&self.pool, "villas", &to_row(&villa)?).await?;
        }
        tracing::info!(villas = total, "Seeded demo villas");
        Ok(())
    }

    pub fn spawn_change_listener(&self) {
        let pool = self.pool.clone();
        let events = self.events.clone();
        let active = Arc::clone(&self.listener_active);

        tokio::spawn(async move {
            loop {
                match PgListener::connect_with(&pool).await {
                    Ok(mut listener) => {
                        if let Err(error) = listener.listen(CHANGE_CHANNEL).await {
                            tracing::warn!(error = %error, "Could not subscribe to store changes");
                        } else {
                            active.store(true, Ordering::SeqCst);
                            tracing::info!(channel = CHANGE_CHANNEL, "Listening for store changes");
                            loop {
                                match listener.recv().await {
                                    Ok(notification) => {
                                        match parse_change_notification(notification.payload()) {
                                            Some(event) => {
                                                let _ = events.send(event);
                                            }
                                            None => tracing::debug!(
                                                payload = notification.payload(),
                                                "Ignoring unrecognised store notification"
                                            ),
                                        }
                                    }
                                    Err(error) => {
                                        tracing::warn!(error = %error, "Store change listener disconnected");
                                        break;
                                    }
                                }
                            }
                            active.store(false, Ordering::SeqCst);
                        }
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "Could not connect store change listener");
                    }
                }
                tokio::time::sleep(LISTENER_RETRY).await;
            }
        });
    }

    /// Publishes locally only while the database listener is down, so
    /// subscribers do not see every write twice.
    fn publish(&self, table: StoreTable, action: StoreAction, id: &str) {
        if !self.listener_active.load(Ordering::SeqCst) {
            let _ = self.events.send(StoreEvent::new(table, action, id));
        }
    }
}

pub(crate) fn parse_change_notification(payload: &str) -> Option<StoreEvent> {
    let value = serde_json::from_str::<Value>(payload).ok()?;
    let table = StoreTable::from_name(value.get("table")?.as_str()?)?;
    let action = StoreAction::from_name(value.get("action")?.as_str()?)?;
    let id = value.get("id")?.as_str()?;
    Some(StoreEvent::new(table, action, id))
}

fn to_row<T: Serialize>(value: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::Invalid("Expected an object payload.".to_string())),
    }
}

fn from_row<T: DeserializeOwned>(row: Value) -> StoreResult<T> {
    Ok(serde_json::from_value(row)?)
}

fn from_rows<T: DeserializeOwned>(rows: Vec<Value>) -> StoreResult<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}

fn touched(mut patch: Map<String, Value>) -> Map<String, Value> {
    patch.insert(
        "updated_at".to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
    patch
}

#[async_trait]
impl VillaStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn list_villas(&self) -> StoreResult<Vec<Villa>> {
        from_rows(list_rows(&self.pool, "villas", None, "created_at", true).await?)
    }

    async fn get_villa(&self, id: &str) -> StoreResult<Villa> {
        from_row(get_row(&self.pool, "villas", id).await?)
    }

    async fn create_villa(&self, input: NewVilla) -> StoreResult<Villa> {
        let mut row = to_row(&input)?;
        row.insert("id".to_string(), Value::String(new_id()));
        let villa: Villa = from_row(create_row(&self.pool, "villas", &row).await?)?;
        self.publish(StoreTable::Villas, StoreAction::Insert, &villa.id);
        Ok(villa)
    }

    async fn update_villa(&self, id: &str, patch: VillaPatch) -> StoreResult<Villa> {
        let row = touched(to_row(&patch)?);
        let villa: Villa = from_row(update_row(&self.pool, "villas", id, &row).await?)?;
        self.publish(StoreTable::Villas, StoreAction::Update, id);
        Ok(villa)
    }

    async fn delete_villa(&self, id: &str) -> StoreResult<()> {
        delete_row(&self.pool, "villas", id).await?;
        self.publish(StoreTable::Villas, StoreAction::Delete, id);
        Ok(())
    }

    async fn list_leads(&self) -> StoreResult<Vec<Lead>> {
        from_rows(list_rows(&self.pool, "leads", None, "created_at", false).await?)
    }

    async fn create_lead(&self, input: NewLead) -> StoreResult<Lead> {
        let mut row = to_row(&input)?;
        row.insert("id".to_string(), Value::String(new_id()));
        row.insert(
            "status".to_string(),
            Value::String(LeadStatus::New.as_str().to_string()),
        );
        let lead: Lead = from_row(create_row(&self.pool, "leads", &row).await?)?;
        self.publish(StoreTable::Leads, StoreAction::Insert, &lead.id);
        Ok(lead)
    }

    async fn update_lead(&self, id: &str, patch: LeadPatch) -> StoreResult<Lead> {
        let row = touched(to_row(&patch)?);
        let lead: Lead = from_row(update_row(&self.pool, "leads", id, &row).await?)?;
        self.publish(StoreTable::Leads, StoreAction::Update, id);
        Ok(lead)
    }

    async fn delete_lead(&self, id: &str) -> StoreResult<()> {
        delete_row(&self.pool, "leads", id).await?;
        self.publish(StoreTable::Leads, StoreAction::Delete, id);
        Ok(())
    }

    async fn list_reviews(&self, villa_id: Option<&str>) -> StoreResult<Vec<Review>> {
        let filters = villa_id.map(|villa_id| {
            let mut filters = Map::new();
            filters.insert("villa_id".to_string(), Value::String(villa_id.to_string()));
            filters
        });
        from_rows(list_rows(&self.pool, "reviews", filters.as_ref(), "created_at", false).await?)
    }

    async fn create_review(&self, input: NewReview) -> StoreResult<Review> {
        let mut row = to_row(&input)?;
        row.insert("id".to_string(), Value::String(new_id()));
        row.insert("approved".to_string(), Value::Bool(false));
        let review: Review = from_row(create_row(&self.pool, "reviews", &row).await?)?;
        self.publish(StoreTable::Reviews, StoreAction::Insert, &review.id);
        Ok(review)
    }

    async fn moderate_review(&self, id: &str, approved: bool) -> StoreResult<Review> {
        let mut tx = self.pool.begin().await?;
        let current: Review = from_row(lock_row_tx(&mut tx, "reviews", id).await?)?;
        let villa: Villa = from_row(lock_row_tx(&mut tx, "villas", &current.villa_id).await?)?;

        let patch = rating_patch(villa.rating, villa.rating_count, &current, approved);
        let mut row = Map::new();
        row.insert("approved".to_string(), Value::Bool(approved));
        let review: Review = from_row(update_row_tx(&mut tx, "reviews", id, &row).await?)?;
        if let Some(patch) = &patch {
            update_row_tx(&mut tx, "villas", &villa.id, &touched(to_row(patch)?)).await?;
        }
        tx.commit().await?;

        self.publish(StoreTable::Reviews, StoreAction::Update, id);
        if patch.is_some() {
            self.publish(StoreTable::Villas, StoreAction::Update, &villa.id);
        }
        Ok(review)
    }

    async fn delete_review(&self, id: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let review: Review = from_row(lock_row_tx(&mut tx, "reviews", id).await?)?;
        let villa: Villa = from_row(lock_row_tx(&mut tx, "villas", &review.villa_id).await?)?;

        let patch = rating_patch(villa.rating, villa.rating_count, &review, false);
        if let Some(patch) = &patch {
            update_row_tx(&mut tx, "villas", &villa.id, &touched(to_row(patch)?)).await?;
        }
        delete_row_tx(&mut tx, "reviews", id).await?;
        tx.commit().await?;

        self.publish(StoreTable::Reviews, StoreAction::Delete, id);
        if patch.is_some() {
            self.publish(StoreTable::Villas, StoreAction::Update, &villa.id);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
