use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Villa;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Matched against both location and name.
    pub location: String,
    pub min_price: i64,
    pub max_price: i64,
    /// 0 means any.
    pub bedrooms: u32,
    pub guests: Option<u32>,
    /// Carried for the inquiry context only; there is no availability ledger.
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            location: String::new(),
            min_price: 0,
            max_price: i64::MAX,
            bedrooms: 0,
            guests: None,
            check_in: None,
            check_out: None,
        }
    }
}

impl FilterCriteria {
    pub fn matches(&self, villa: &Villa) -> bool {
        let needle = self.location.trim().to_lowercase();
        let text_match = needle.is_empty()
            || villa.location.to_lowercase().contains(&needle)
            || villa.name.to_lowercase().contains(&needle);

        let price_match = villa.price >= self.min_price && villa.price <= self.max_price;
        let bedroom_match = self.bedrooms == 0 || villa.bedrooms >= self.bedrooms;
        let guest_match = match self.guests {
            None | Some(0) => true,
            Some(guests) => villa.capacity >= guests,
        };

        text_match && price_match && bedroom_match && guest_match
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    #[serde(rename = "price-asc", alias = "price-low")]
    PriceAsc,
    #[serde(rename = "price-desc", alias = "price-high")]
    PriceDesc,
    #[serde(rename = "rating")]
    Rating,
    #[default]
    #[serde(rename = "popular", alias = "popularity")]
    Popularity,
}

impl SortKey {
    /// Unknown names fall back to the default ordering.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw
            .map(str::trim)
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "price-asc" | "price-low" => Self::PriceAsc,
            "price-desc" | "price-high" => Self::PriceDesc,
            "rating" => Self::Rating,
            _ => Self::Popularity,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::Rating => "rating",
            Self::Popularity => "popular",
        }
    }
}

/// Filters then stably sorts; ties keep their input order.
pub fn apply(listings: &[Villa], criteria: &FilterCriteria, sort: SortKey) -> Vec<Villa> {
    let mut visible = listings
        .iter()
        .filter(|villa| criteria.matches(villa))
        .cloned()
        .collect::<Vec<_>>();
    sort_villas(&mut visible, sort);
    visible
}

pub fn sort_villas(villas: &mut [Villa], sort: SortKey) {
    match sort {
        SortKey::PriceAsc => villas.sort_by(|a, b| a.price.cmp(&b.price)),
        SortKey::PriceDesc => villas.sort_by(|a, b| b.price.cmp(&a.price)),
        SortKey::Rating => villas.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        SortKey::Popularity => villas.sort_by(|a, b| b.rating_count.cmp(&a.rating_count)),
    }
}

pub fn featured(listings: &[Villa], limit: usize) -> Vec<Villa> {
    let mut picked = listings
        .iter()
        .filter(|villa| villa.featured)
        .cloned()
        .collect::<Vec<_>>();
    sort_villas(&mut picked, SortKey::Popularity);
    picked.truncate(limit);
    picked
}

/// Lowest and highest nightly price, for the filter slider.
pub fn price_bounds(listings: &[Villa]) -> Option<(i64, i64)> {
    let min = listings.iter().map(|villa| villa.price).min()?;
    let max = listings.iter().map(|villa| villa.price).max()?;
    Some((min, max))
}

/// Distinct primary locations in first-seen order.
pub fn locations(listings: &[Villa]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for villa in listings {
        let primary = villa.primary_location();
        if primary.is_empty() || seen.iter().any(|existing| existing == primary) {
            continue;
        }
        seen.push(primary.to_string());
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::villa;

    fn sample() -> Vec<Villa> {
        vec![
            villa("anjuna", "Anjuna, Goa", 28_500, 2, 6),
            villa("lonavala", "Lonavala, MH", 53_495, 3, 12),
        ]
    }

    fn ids(villas: &[Villa]) -> Vec<&str> {
        villas.iter().map(|villa| villa.id.as_str()).collect()
    }

    #[test]
    fn location_query_is_case_insensitive_substring() {
        let criteria = FilterCriteria {
            location: "goa".to_string(),
            max_price: 150_000,
            ..FilterCriteria::default()
        };
        let result = apply(&sample(), &criteria, SortKey::Popularity);
        assert_eq!(ids(&result), vec!["anjuna"]);
    }

    #[test]
    fn location_query_also_matches_name() {
        let criteria = FilterCriteria {
            location: "VILLA LONA".to_string(),
            ..FilterCriteria::default()
        };
        let result = apply(&sample(), &criteria, SortKey::Popularity);
        assert_eq!(ids(&result), vec!["lonavala"]);
    }

    #[test]
    fn price_desc_orders_most_expensive_first() {
        let result = apply(&sample(), &FilterCriteria::default(), SortKey::PriceDesc);
        assert_eq!(ids(&result), vec!["lonavala", "anjuna"]);
        let result = apply(&sample(), &FilterCriteria::default(), SortKey::PriceAsc);
        assert_eq!(ids(&result), vec!["anjuna", "lonavala"]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        for sort in [
            SortKey::PriceAsc,
            SortKey::PriceDesc,
            SortKey::Rating,
            SortKey::Popularity,
        ] {
            assert!(apply(&[], &FilterCriteria::default(), sort).is_empty());
        }
    }

    #[test]
    fn inverted_price_band_is_empty_not_error() {
        let criteria = FilterCriteria {
            min_price: 60_000,
            max_price: 10_000,
            ..FilterCriteria::default()
        };
        assert!(apply(&sample(), &criteria, SortKey::PriceAsc).is_empty());
    }

    #[test]
    fn bedroom_and_guest_floors() {
        let criteria = FilterCriteria {
            bedrooms: 3,
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&apply(&sample(), &criteria, SortKey::PriceAsc)), vec!["lonavala"]);

        let criteria = FilterCriteria {
            guests: Some(7),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&apply(&sample(), &criteria, SortKey::PriceAsc)), vec!["lonavala"]);

        let criteria = FilterCriteria {
            guests: Some(0),
            ..FilterCriteria::default()
        };
        assert_eq!(apply(&sample(), &criteria, SortKey::PriceAsc).len(), 2);
    }

    #[test]
    fn stay_dates_never_exclude_listings() {
        let criteria = FilterCriteria {
            check_in: NaiveDate::from_ymd_opt(2026, 12, 24),
            check_out: NaiveDate::from_ymd_opt(2026, 12, 20),
            ..FilterCriteria::default()
        };
        assert_eq!(apply(&sample(), &criteria, SortKey::PriceAsc).len(), 2);
    }

    #[test]
    fn sorting_is_stable_for_equal_keys() {
        let mut listings = vec![
            villa("a", "Goa", 10_000, 2, 4),
            villa("b", "Goa", 5_000, 2, 4),
            villa("c", "Goa", 10_000, 2, 4),
            villa("d", "Goa", 5_000, 2, 4),
        ];
        listings[0].rating = 4.5;
        listings[1].rating = 4.9;
        listings[2].rating = 4.5;
        listings[3].rating = 4.9;

        let by_price = apply(&listings, &FilterCriteria::default(), SortKey::PriceAsc);
        assert_eq!(ids(&by_price), vec!["b", "d", "a", "c"]);
        let by_rating = apply(&listings, &FilterCriteria::default(), SortKey::Rating);
        assert_eq!(ids(&by_rating), vec!["b", "d", "a", "c"]);
        let by_popularity = apply(&listings, &FilterCriteria::default(), SortKey::Popularity);
        assert_eq!(ids(&by_popularity), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn popularity_orders_by_rating_count() {
        let mut listings = sample();
        listings[0].rating_count = 12;
        listings[1].rating_count = 80;
        let result = apply(&listings, &FilterCriteria::default(), SortKey::default());
        assert_eq!(ids(&result), vec!["lonavala", "anjuna"]);
    }

    #[test]
    fn reapplying_filter_is_idempotent_and_a_subset() {
        let mut listings = sample();
        listings.push(villa("alibaug", "Alibaug, MH", 40_000, 4, 10));
        let criteria = FilterCriteria {
            location: "mh".to_string(),
            min_price: 30_000,
            ..FilterCriteria::default()
        };
        let once = apply(&listings, &criteria, SortKey::PriceAsc);
        let twice = apply(&once, &criteria, SortKey::PriceAsc);
        assert_eq!(once, twice);
        assert!(once.iter().all(|item| listings.contains(item)));
        assert_eq!(ids(&once), vec!["alibaug", "lonavala"]);
    }

    #[test]
    fn sort_key_parsing_falls_back_to_popularity() {
        assert_eq!(SortKey::parse_or_default(Some("price-high")), SortKey::PriceDesc);
        assert_eq!(SortKey::parse_or_default(Some(" Rating ")), SortKey::Rating);
        assert_eq!(SortKey::parse_or_default(Some("newest")), SortKey::Popularity);
        assert_eq!(SortKey::parse_or_default(None), SortKey::Popularity);
    }

    #[test]
    fn catalog_helpers() {
        let mut listings = sample();
        listings.push(villa("vagator", "Vagator, Goa", 19_000, 2, 4));
        listings.push(villa("anjuna-2", "Anjuna, Goa", 31_000, 3, 8));
        listings[1].featured = true;
        listings[3].featured = true;
        listings[3].rating_count = 5;

        assert_eq!(price_bounds(&listings), Some((19_000, 53_495)));
        assert_eq!(price_bounds(&[]), None);
        assert_eq!(locations(&listings), vec!["Anjuna", "Lonavala", "Vagator"]);
        assert_eq!(ids(&featured(&listings, 1)), vec!["anjuna-2"]);
    }
}
