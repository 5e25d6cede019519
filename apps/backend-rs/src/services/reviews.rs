use crate::models::{Review, VillaPatch};

/// Running average after counting one more approved review.
pub fn fold_rating(rating: f64, count: u32, stars: u8) -> (f64, u32) {
    let total = rating * f64::from(count) + f64::from(stars);
    let count = count.saturating_add(1);
    (round_rating(total / f64::from(count)), count)
}

/// Inverse of [`fold_rating`], used when an approved review is withdrawn.
pub fn unfold_rating(rating: f64, count: u32, stars: u8) -> (f64, u32) {
    if count <= 1 {
        return (0.0, 0);
    }
    let total = rating * f64::from(count) - f64::from(stars);
    let count = count - 1;
    (round_rating(total / f64::from(count)), count)
}

/// Patch to apply to the villa when `review` flips approval state.
pub fn rating_patch(
    villa_rating: f64,
    villa_count: u32,
    review: &Review,
    approved: bool,
) -> Option<VillaPatch> {
    if review.approved == approved {
        return None;
    }
    let (rating, rating_count) = if approved {
        fold_rating(villa_rating, villa_count, review.rating)
    } else {
        unfold_rating(villa_rating, villa_count, review.rating)
    };
    Some(VillaPatch {
        rating: Some(rating),
        rating_count: Some(rating_count),
        ..VillaPatch::default()
    })
}

fn round_rating(value: f64) -> f64 {
    ((value * 100.0).round() / 100.0).clamp(0.0, 5.0)
}
