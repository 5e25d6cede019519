use chrono::{Duration, Utc};

use crate::models::Villa;

struct SeedVilla {
    id: &'static str,
    name: &'static str,
    location: &'static str,
    price: i64,
    bedrooms: u32,
    bathrooms: u32,
    capacity: u32,
    description: &'static str,
    images: &'static [&'static str],
    featured: bool,
    rating: f64,
    rating_count: u32,
    pet_friendly: bool,
    amenities: &'static [&'static str],
}

const SEED: &[SeedVilla] = &[
    SeedVilla {
        id: "villa-casa-anjuna",
        name: "Casa Anjuna",
        location: "Anjuna, Goa",
        price: 28_500,
        bedrooms: 2,
        bathrooms: 2,
        capacity: 6,
        description: "Portuguese-style home a short walk from Anjuna beach, with a plunge pool and a shaded verandah.",
        images: &[
            "https://images.unsplash.com/photo-1566073771259-6a8506099945?w=1200",
            "https://images.unsplash.com/photo-1582268611958-ebfd161ef9cf?w=1200",
        ],
        featured: true,
        rating: 4.7,
        rating_count: 86,
        pet_friendly: true,
        amenities: &["Private pool", "Wi-Fi", "Air conditioning", "Caretaker"],
    },
    SeedVilla {
        id: "villa-misty-ridge",
        name: "Misty Ridge Estate",
        location: "Lonavala, Maharashtra",
        price: 53_495,
        bedrooms: 3,
        bathrooms: 3,
        capacity: 12,
        description: "Hilltop estate overlooking the valley, with a heated pool, lawn and in-house chef.",
        images: &[
            "https://images.unsplash.com/photo-1613490493576-7fde63acd811?w=1200",
            "https://images.unsplash.com/photo-1600585154340-be6161a56a0c?w=1200",
        ],
        featured: true,
        rating: 4.9,
        rating_count: 142,
        pet_friendly: false,
        amenities: &["Heated pool", "Chef on call", "Lawn", "Parking"],
    },
    SeedVilla {
        id: "villa-sea-breeze",
        name: "Sea Breeze Villa",
        location: "Alibaug, Maharashtra",
        price: 41_000,
        bedrooms: 4,
        bathrooms: 4,
        capacity: 10,
        description: "Beach-facing villa with a large deck, outdoor shower and a garden for evening barbecues.",
        images: &["https://images.unsplash.com/photo-1580587771525-78b9dba3b914?w=1200"],
        featured: false,
        rating: 4.6,
        rating_count: 58,
        pet_friendly: true,
        amenities: &["Beach access", "Barbecue", "Wi-Fi"],
    },
    SeedVilla {
        id: "villa-riverbend",
        name: "Riverbend Farmhouse",
        location: "Karjat, Maharashtra",
        price: 22_000,
        bedrooms: 3,
        bathrooms: 2,
        capacity: 9,
        description: "Farm stay by the river with a bonfire pit, cricket pitch and mango orchard.",
        images: &[],
        featured: false,
        rating: 4.4,
        rating_count: 31,
        pet_friendly: true,
        amenities: &["Bonfire", "Orchard", "Parking"],
    },
    SeedVilla {
        id: "villa-coffee-trails",
        name: "Coffee Trails Bungalow",
        location: "Coorg, Karnataka",
        price: 35_750,
        bedrooms: 4,
        bathrooms: 3,
        capacity: 11,
        description: "Colonial bungalow inside a working coffee estate, with guided plantation walks.",
        images: &["https://images.unsplash.com/photo-1600596542815-ffad4c1539a9?w=1200"],
        featured: true,
        rating: 4.8,
        rating_count: 64,
        pet_friendly: false,
        amenities: &["Estate walks", "Fireplace", "Breakfast included"],
    },
    SeedVilla {
        id: "villa-lakeside-haveli",
        name: "Lakeside Haveli",
        location: "Udaipur, Rajasthan",
        price: 67_200,
        bedrooms: 5,
        bathrooms: 5,
        capacity: 14,
        description: "Restored haveli on the lake shore with a rooftop terrace and courtyard pool.",
        images: &[
            "https://images.unsplash.com/photo-1564013799919-ab600027ffc6?w=1200",
            "https://images.unsplash.com/photo-1512917774080-9991f1c4c750?w=1200",
        ],
        featured: false,
        rating: 4.9,
        rating_count: 23,
        pet_friendly: false,
        amenities: &["Courtyard pool", "Rooftop terrace", "Butler service"],
    },
];

/// Demo catalog used when a store starts empty.
pub fn demo_villas() -> Vec<Villa> {
    let now = Utc::now();
    SEED.iter()
        .enumerate()
        .map(|(index, seed)| (now + Duration::milliseconds(index as i64), seed))
        .map(|(created_at, seed)| Villa {
            id: seed.id.to_string(),
            name: seed.name.to_string(),
            location: seed.location.to_string(),
            price: seed.price,
            bedrooms: seed.bedrooms,
            bathrooms: seed.bathrooms,
            capacity: seed.capacity,
            description: seed.description.to_string(),
            images: seed.images.iter().map(|url| url.to_string()).collect(),
            featured: seed.featured,
            rating: seed.rating,
            rating_count: seed.rating_count,
            pet_friendly: seed.pet_friendly,
            amenities: seed.amenities.iter().map(|item| item.to_string()).collect(),
            created_at,
            updated_at: created_at,
        })
        .collect()
}
