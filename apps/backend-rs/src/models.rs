use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A rentable villa as shown in the public catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Villa {
    pub id: String,
    pub name: String,
    /// Free text, "Area, Region".
    pub location: String,
    /// Nightly price.
    pub price: i64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub capacity: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub rating_count: u32,
    #[serde(default)]
    pub pet_friendly: bool,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Villa {
    /// Leading comma-separated segment of the location, trimmed.
    pub fn primary_location(&self) -> &str {
        self.location
            .split(',')
            .next()
            .map(str::trim)
            .unwrap_or_default()
    }

    pub fn cover_image<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.images
            .first()
            .map(String::as_str)
            .unwrap_or(placeholder)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewVilla {
    pub name: String,
    pub location: String,
    pub price: i64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub capacity: u32,
    pub description: String,
    pub images: Vec<String>,
    pub featured: bool,
    pub rating: f64,
    pub rating_count: u32,
    pub pet_friendly: bool,
    pub amenities: Vec<String>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VillaPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_friendly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<String>>,
}

impl VillaPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, villa: &mut Villa) {
        if let Some(name) = &self.name {
            villa.name = name.clone();
        }
        if let Some(location) = &self.location {
            villa.location = location.clone();
        }
        if let Some(price) = self.price {
            villa.price = price;
        }
        if let Some(bedrooms) = self.bedrooms {
            villa.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = self.bathrooms {
            villa.bathrooms = bathrooms;
        }
        if let Some(capacity) = self.capacity {
            villa.capacity = capacity;
        }
        if let Some(description) = &self.description {
            villa.description = description.clone();
        }
        if let Some(images) = &self.images {
            villa.images = images.clone();
        }
        if let Some(featured) = self.featured {
            villa.featured = featured;
        }
        if let Some(rating) = self.rating {
            villa.rating = rating;
        }
        if let Some(rating_count) = self.rating_count {
            villa.rating_count = rating_count;
        }
        if let Some(pet_friendly) = self.pet_friendly {
            villa.pet_friendly = pet_friendly;
        }
        if let Some(amenities) = &self.amenities {
            villa.amenities = amenities.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    #[default]
    Whatsapp,
    ContactForm,
    Callback,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Booked,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [Self::New, Self::Contacted, Self::Booked, Self::Lost];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Booked => "booked",
            Self::Lost => "lost",
        }
    }
}

/// A guest inquiry captured by the funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub villa_id: Option<String>,
    pub villa_name: Option<String>,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: Option<u32>,
    pub message: Option<String>,
    #[serde(default)]
    pub source: LeadSource,
    #[serde(default)]
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLead {
    pub villa_id: Option<String>,
    pub villa_name: Option<String>,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: Option<u32>,
    pub message: Option<String>,
    pub source: LeadSource,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LeadPatch {
    pub fn apply_to(&self, lead: &mut Lead) {
        if let Some(status) = self.status {
            lead.status = status;
        }
        if let Some(message) = &self.message {
            lead.message = Some(message.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub villa_id: String,
    pub guest_name: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    pub villa_id: String,
    pub guest_name: String,
    pub rating: u8,
    pub comment: String,
}
