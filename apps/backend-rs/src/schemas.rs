use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Deserialize;
use url::Url;
use validator::Validate;

use crate::error::AppError;
use crate::models::{LeadStatus, NewVilla, VillaPatch};
use crate::services::catalog::{FilterCriteria, SortKey};
use crate::services::date_range::parse_iso_date;

pub const MAX_GALLERY_IMAGES: usize = 12;
pub const MAX_AMENITIES: usize = 24;

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

pub fn clamp_limit_in_range(limit: i64, minimum: i64, maximum: i64) -> i64 {
    limit.clamp(minimum, maximum)
}

fn default_limit_3() -> i64 {
    3
}
fn default_limit_6() -> i64 {
    6
}

// ===== Paths =====

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct VillaPath {
    pub villa_id: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct LeadPath {
    pub lead_id: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct ReviewPath {
    pub review_id: String,
}

// ===== Catalog =====

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub struct CatalogQuery {
    pub location: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub bedrooms: Option<u32>,
    pub guests: Option<u32>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub sort: Option<String>,
}

impl CatalogQuery {
    pub fn criteria(&self) -> FilterCriteria {
        let defaults = FilterCriteria::default();
        FilterCriteria {
            location: self
                .location
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            min_price: self.min_price.unwrap_or(defaults.min_price),
            max_price: self.max_price.unwrap_or(defaults.max_price),
            bedrooms: self.bedrooms.unwrap_or(defaults.bedrooms),
            guests: self.guests,
            check_in: self.check_in.as_deref().and_then(parse_iso_date),
            check_out: self.check_out.as_deref().and_then(parse_iso_date),
        }
    }

    pub fn sort_key(&self) -> SortKey {
        SortKey::parse_or_default(self.sort.as_deref())
    }

    /// Cache key built from the normalized criteria, so equivalent queries
    /// share one entry.
    pub fn cache_key(&self) -> String {
        let criteria = self.criteria();
        format!(
            "villas|{}|{}|{}|{}|{}|{}",
            criteria.location.to_lowercase(),
            criteria.min_price,
            criteria.max_price,
            criteria.bedrooms,
            criteria.guests.unwrap_or_default(),
            self.sort_key().as_str()
        )
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct FeaturedQuery {
    #[serde(default = "default_limit_6")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct SimilarQuery {
    #[serde(default = "default_limit_3")]
    pub limit: i64,
}

// ===== Calendar =====

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub struct CalendarQuery {
    pub month: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub hover: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct CalendarSelectInput {
    pub start: Option<String>,
    pub end: Option<String>,
    pub day: String,
}

// ===== Leads =====

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct InquiryInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 6, max = 32))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    #[validate(range(min = 1, max = 100))]
    pub guests: Option<u32>,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct ContactInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 6, max = 32))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
    pub villa_id: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    /// Guest asked to be phoned back instead of messaged.
    #[serde(default)]
    pub request_callback: bool,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct UpdateLeadInput {
    pub status: Option<LeadStatus>,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub struct AdminLeadsQuery {
    pub status: Option<LeadStatus>,
}

// ===== Reviews =====

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct CreateReviewInput {
    #[validate(length(min = 1, max = 120))]
    pub guest_name: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub comment: String,
}

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub struct AdminReviewsQuery {
    pub villa_id: Option<String>,
    pub approved: Option<bool>,
}

// ===== Villas (admin) =====

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct CreateVillaInput {
    #[validate(length(min = 1, max = 160))]
    pub name: String,
    #[validate(length(min = 1, max = 160))]
    pub location: String,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(range(max = 50))]
    pub bedrooms: u32,
    #[validate(range(max = 50))]
    pub bathrooms: u32,
    #[validate(range(min = 1, max = 100))]
    pub capacity: u32,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: Option<f64>,
    pub rating_count: Option<u32>,
    #[serde(default)]
    pub pet_friendly: bool,
    #[serde(default)]
    pub amenities: Vec<String>,
}

impl CreateVillaInput {
    pub fn into_new_villa(self) -> Result<NewVilla, AppError> {
        Ok(NewVilla {
            name: self.name.trim().to_string(),
            location: self.location.trim().to_string(),
            price: self.price,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            capacity: self.capacity,
            description: self.description.trim().to_string(),
            images: normalize_image_urls(&self.images)?,
            featured: self.featured,
            rating: self.rating.unwrap_or_default(),
            rating_count: self.rating_count.unwrap_or_default(),
            pet_friendly: self.pet_friendly,
            amenities: normalize_amenities(&self.amenities)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize, Validate)]
pub struct UpdateVillaInput {
    #[validate(length(min = 1, max = 160))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 160))]
    pub location: Option<String>,
    #[validate(range(min = 0))]
    pub price: Option<i64>,
    #[validate(range(max = 50))]
    pub bedrooms: Option<u32>,
    #[validate(range(max = 50))]
    pub bathrooms: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub capacity: Option<u32>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub featured: Option<bool>,
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: Option<f64>,
    pub rating_count: Option<u32>,
    pub pet_friendly: Option<bool>,
    pub amenities: Option<Vec<String>>,
}

impl UpdateVillaInput {
    pub fn into_patch(self) -> Result<VillaPatch, AppError> {
        let patch = VillaPatch {
            name: self.name.map(|value| value.trim().to_string()),
            location: self.location.map(|value| value.trim().to_string()),
            price: self.price,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            capacity: self.capacity,
            description: self.description.map(|value| value.trim().to_string()),
            images: self
                .images
                .as_deref()
                .map(normalize_image_urls)
                .transpose()?,
            featured: self.featured,
            rating: self.rating,
            rating_count: self.rating_count,
            pet_friendly: self.pet_friendly,
            amenities: self
                .amenities
                .as_deref()
                .map(normalize_amenities)
                .transpose()?,
        };
        if patch.is_empty() {
            return Err(AppError::BadRequest("No fields to update.".to_string()));
        }
        Ok(patch)
    }
}

/// Trims, drops blanks and requires absolute http(s) URLs.
pub fn normalize_image_urls(items: &[String]) -> Result<Vec<String>, AppError> {
    let cleaned = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| match Url::parse(item) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(parsed.to_string()),
            _ => Err(AppError::BadRequest(format!("Invalid image URL '{item}'."))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if cleaned.len() > MAX_GALLERY_IMAGES {
        return Err(AppError::BadRequest(format!(
            "images supports up to {MAX_GALLERY_IMAGES} items."
        )));
    }
    Ok(cleaned)
}

/// Trims and de-duplicates case-insensitively, keeping first spelling.
pub fn normalize_amenities(items: &[String]) -> Result<Vec<String>, AppError> {
    let mut seen = HashSet::new();
    let cleaned = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .map(ToOwned::to_owned)
        .collect::<Vec<_>>();

    if cleaned.len() > MAX_AMENITIES {
        return Err(AppError::BadRequest(format!(
            "amenities supports up to {MAX_AMENITIES} items."
        )));
    }
    Ok(cleaned)
}
