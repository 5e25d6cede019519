use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use super::{
    new_id, StoreAction, StoreError, StoreEvent, StoreResult, StoreTable, VillaStore,
    EVENT_CHANNEL_CAPACITY,
};
use crate::{
    models::{Lead, LeadPatch, LeadStatus, NewLead, NewReview, NewVilla, Review, Villa, VillaPatch},
    services::reviews::rating_patch,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    villas: Vec<Villa>,
    #[serde(default)]
    leads: Vec<Lead>,
    #[serde(default)]
    reviews: Vec<Review>,
}

/// Local fallback store: an in-memory snapshot, optionally mirrored to a
/// JSON file. Writes land in memory first and are rolled back if the file
/// cannot be written.
pub struct LocalStore {
    path: Option<PathBuf>,
    snapshot: RwLock<Snapshot>,
    events: broadcast::Sender<StoreEvent>,
}

impl LocalStore {
    pub fn in_memory(villas: Vec<Villa>) -> Self {
        Self::from_snapshot(
            None,
            Snapshot {
                villas,
                ..Snapshot::default()
            },
        )
    }

    pub async fn open(path: impl AsRef<Path>, seed_when_empty: bool) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut snapshot = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => Snapshot::default(),
            Ok(raw) => serde_json::from_str::<Snapshot>(&raw)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(error) => return Err(error.into()),
        };

        let needs_seed = seed_when_empty && snapshot.villas.is_empty();
        if needs_seed {
            snapshot.villas = super::seed::demo_villas();
            persist(&path, &snapshot).await?;
        }

        tracing::info!(
            path = %path.display(),
            villas = snapshot.villas.len(),
            leads = snapshot.leads.len(),
            reviews = snapshot.reviews.len(),
            seeded = needs_seed,
            "Local store opened"
        );
        Ok(Self::from_snapshot(Some(path), snapshot))
    }

    fn from_snapshot(path: Option<PathBuf>, snapshot: Snapshot) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            path,
            snapshot: RwLock::new(snapshot),
            events,
        }
    }

    /// Applies `change` to the snapshot, persists it, then publishes the event.
    async fn mutate<T, F>(&self, change: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Snapshot) -> StoreResult<(T, StoreEvent)>,
    {
        self.mutate_many(|snapshot| change(snapshot).map(|(value, event)| (value, vec![event])))
            .await
    }

    /// Like [`Self::mutate`] for changes that touch several records. All of
    /// them land, or none do.
    async fn mutate_many<T, F>(&self, change: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Snapshot) -> StoreResult<(T, Vec<StoreEvent>)>,
    {
        let mut guard = self.snapshot.write().await;
        let backup = guard.clone();

        let (value, events) = match change(&mut *guard) {
            Ok(result) => result,
            Err(error) => {
                *guard = backup;
                return Err(error);
            }
        };

        if let Some(path) = &self.path {
            if let Err(error) = persist(path, &*guard).await {
                tracing::warn!(
                    error = %error,
                    changes = events.len(),
                    "Local store write failed, rolling back"
                );
                *guard = backup;
                return Err(error);
            }
        }
        drop(guard);

        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
        Ok(value)
    }
}

async fn persist(path: &Path, snapshot: &Snapshot) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec_pretty(snapshot)?;
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    tokio::fs::write(&staging, body).await?;
    if let Err(error) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(error.into());
    }
    Ok(())
}

fn position_by_id<T>(items: &[T], id: &str, key: impl Fn(&T) -> &str) -> Option<usize> {
    items.iter().position(|item| key(item) == id)
}

#[async_trait]
impl VillaStore for LocalStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn list_villas(&self) -> StoreResult<Vec<Villa>> {
        Ok(self.snapshot.read().await.villas.clone())
    }

    async fn get_villa(&self, id: &str) -> StoreResult<Villa> {
        self.snapshot
            .read()
            .await
            .villas
            .iter()
            .find(|villa| villa.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("villas", id))
    }

    async fn create_villa(&self, input: NewVilla) -> StoreResult<Villa> {
        let now = Utc::now();
        let villa = Villa {
            id: new_id(),
            name: input.name,
            location: input.location,
            price: input.price,
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            capacity: input.capacity,
            description: input.description,
            images: input.images,
            featured: input.featured,
            rating: input.rating,
            rating_count: input.rating_count,
            pet_friendly: input.pet_friendly,
            amenities: input.amenities,
            created_at: now,
            updated_at: now,
        };
        self.mutate(move |snapshot| {
            let event = StoreEvent::new(StoreTable::Villas, StoreAction::Insert, &villa.id);
            snapshot.villas.push(villa.clone());
            Ok((villa, event))
        })
        .await
    }

    async fn update_villa(&self, id: &str, patch: VillaPatch) -> StoreResult<Villa> {
        self.mutate(|snapshot| {
            let index = position_by_id(&snapshot.villas, id, |villa| villa.id.as_str())
                .ok_or_else(|| StoreError::not_found("villas", id))?;
            let villa = &mut snapshot.villas[index];
            patch.apply_to(villa);
            villa.updated_at = Utc::now();
            Ok((
                villa.clone(),
                StoreEvent::new(StoreTable::Villas, StoreAction::Update, id),
            ))
        })
        .await
    }

    async fn delete_villa(&self, id: &str) -> StoreResult<()> {
        self.mutate(|snapshot| {
            let index = position_by_id(&snapshot.villas, id, |villa| villa.id.as_str())
                .ok_or_else(|| StoreError::not_found("villas", id))?;
            snapshot.villas.remove(index);
            snapshot.reviews.retain(|review| review.villa_id != id);
            for lead in &mut snapshot.leads {
                if lead.villa_id.as_deref() == Some(id) {
                    lead.villa_id = None;
                }
            }
            Ok(((), StoreEvent::new(StoreTable::Villas, StoreAction::Delete, id)))
        })
        .await
    }

    async fn list_leads(&self) -> StoreResult<Vec<Lead>> {
        let mut leads = self.snapshot.read().await.leads.clone();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    async fn create_lead(&self, input: NewLead) -> StoreResult<Lead> {
        let now = Utc::now();
        let lead = Lead {
            id: new_id(),
            villa_id: input.villa_id,
            villa_name: input.villa_name,
            name: input.name,
            phone: input.phone,
            email: input.email,
            check_in: input.check_in,
            check_out: input.check_out,
            guests: input.guests,
            message: input.message,
            source: input.source,
            status: LeadStatus::New,
            created_at: now,
            updated_at: now,
        };
        self.mutate(move |snapshot| {
            let event = StoreEvent::new(StoreTable::Leads, StoreAction::Insert, &lead.id);
            snapshot.leads.push(lead.clone());
            Ok((lead, event))
        })
        .await
    }

    async fn update_lead(&self, id: &str, patch: LeadPatch) -> StoreResult<Lead> {
        self.mutate(|snapshot| {
            let index = position_by_id(&snapshot.leads, id, |lead| lead.id.as_str())
                .ok_or_else(|| StoreError::not_found("leads", id))?;
            let lead = &mut snapshot.leads[index];
            patch.apply_to(lead);
            lead.updated_at = Utc::now();
            Ok((
                lead.clone(),
                StoreEvent::new(StoreTable::Leads, StoreAction::Update, id),
            ))
        })
        .await
    }

    async fn delete_lead(&self, id: &str) -> StoreResult<()> {
        self.mutate(|snapshot| {
            let index = position_by_id(&snapshot.leads, id, |lead| lead.id.as_str())
                .ok_or_else(|| StoreError::not_found("leads", id))?;
            snapshot.leads.remove(index);
            Ok(((), StoreEvent::new(StoreTable::Leads, StoreAction::Delete, id)))
        })
        .await
    }

    async fn list_reviews(&self, villa_id: Option<&str>) -> StoreResult<Vec<Review>> {
        let mut reviews = self
            .snapshot
            .read()
            .await
            .reviews
            .iter()
            .filter(|review| villa_id.is_none_or(|villa_id| review.villa_id == villa_id))
            .cloned()
            .collect::<Vec<_>>();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn create_review(&self, input: NewReview) -> StoreResult<Review> {
        let review = Review {
            id: new_id(),
            villa_id: input.villa_id,
            guest_name: input.guest_name,
            rating: input.rating,
            comment: input.comment,
            approved: false,
            created_at: Utc::now(),
        };
        self.mutate(move |snapshot| {
            if !snapshot.villas.iter().any(|villa| villa.id == review.villa_id) {
                return Err(StoreError::not_found("villas", &review.villa_id));
            }
            let event = StoreEvent::new(StoreTable::Reviews, StoreAction::Insert, &review.id);
            snapshot.reviews.push(review.clone());
            Ok((review, event))
        })
        .await
    }

    async fn moderate_review(&self, id: &str, approved: bool) -> StoreResult<Review> {
        self.mutate_many(|snapshot| {
            let index = position_by_id(&snapshot.reviews, id, |review| review.id.as_str())
                .ok_or_else(|| StoreError::not_found("reviews", id))?;
            let mut events = vec![StoreEvent::new(StoreTable::Reviews, StoreAction::Update, id)];

            let review = &snapshot.reviews[index];
            if let Some(villa) = snapshot
                .villas
                .iter_mut()
                .find(|villa| villa.id == review.villa_id)
            {
                if let Some(patch) = rating_patch(villa.rating, villa.rating_count, review, approved)
                {
                    patch.apply_to(villa);
                    villa.updated_at = Utc::now();
                    events.push(StoreEvent::new(
                        StoreTable::Villas,
                        StoreAction::Update,
                        &villa.id,
                    ));
                }
            }

            let review = &mut snapshot.reviews[index];
            review.approved = approved;
            Ok((review.clone(), events))
        })
        .await
    }

    async fn delete_review(&self, id: &str) -> StoreResult<()> {
        self.mutate_many(|snapshot| {
            let index = position_by_id(&snapshot.reviews, id, |review| review.id.as_str())
                .ok_or_else(|| StoreError::not_found("reviews", id))?;
            let review = snapshot.reviews.remove(index);
            let mut events = vec![StoreEvent::new(StoreTable::Reviews, StoreAction::Delete, id)];

            if let Some(villa) = snapshot
                .villas
                .iter_mut()
                .find(|villa| villa.id == review.villa_id)
            {
                if let Some(patch) =
                    rating_patch(villa.rating, villa.rating_count, &review, false)
                {
                    patch.apply_to(villa);
                    villa.updated_at = Utc::now();
                    events.push(StoreEvent::new(
                        StoreTable::Villas,
                        StoreAction::Update,
                        &villa.id,
                    ));
                }
            }
            Ok(((), events))
        })
        .await
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
