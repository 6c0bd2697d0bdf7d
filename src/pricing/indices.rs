use super::{MAX_INDEX, NEUTRAL_INDEX};
use rust_decimal::Decimal;

/// Popularity points per hype index point
const POPULARITY_DIVISOR: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
/// Popularity at which the hype index reaches its cap
pub const POPULARITY_SATURATION: Decimal = Decimal::from_parts(500, 0, 0, false, 0);
/// Maximum word-of-mouth bonus for a well reviewed movie
const MAX_REVIEW_BONUS: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
/// Review count at which the bonus saturates
const REVIEW_BONUS_SATURATION: Decimal = Decimal::TEN;

const MIN_RATING: Decimal = Decimal::ONE;
const MAX_RATING: Decimal = Decimal::TEN;

/// Convert a provider popularity score to a hype index (0-100).
///
/// Popularity is unbounded; it is divided by 5 and capped, so anything at or
/// above 500 saturates at 100 (250 -> 50, 50 -> 10).
pub fn hype_index_from_popularity(popularity: Decimal) -> Decimal {
    (popularity / POPULARITY_DIVISOR)
        .min(MAX_INDEX)
        .max(Decimal::ZERO)
}

/// Calculate the word-of-mouth index from review ratings.
///
/// Ratings are on a 1-10 scale; nulls and anything outside that range are
/// dropped first. With nothing left the neutral 50 is returned. Otherwise the
/// mean is scaled to 0-100 and a bonus of up to 5 points is added for review
/// volume, reaching the full bonus at 10 reviews.
///
/// # Arguments
/// * `ratings` - Raw ratings as stored, possibly null
pub fn wom_index_from_ratings(ratings: &[Option<Decimal>]) -> Decimal {
    let valid: Vec<Decimal> = ratings
        .iter()
        .flatten()
        .copied()
        .filter(|r| *r >= MIN_RATING && *r <= MAX_RATING)
        .collect();

    if valid.is_empty() {
        return NEUTRAL_INDEX;
    }

    let count = Decimal::from(valid.len() as u64);
    let avg: Decimal = valid.iter().sum::<Decimal>() / count;

    let base = avg / Decimal::TEN * Decimal::ONE_HUNDRED;
    let count_factor = (count / REVIEW_BONUS_SATURATION).min(Decimal::ONE);
    let wom = base + count_factor * MAX_REVIEW_BONUS;

    wom.max(Decimal::ZERO).min(MAX_INDEX)
}
