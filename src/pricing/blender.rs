use super::{MAX_PRICE, MIN_PRICE};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Weight of the hype index in the trend score (0.4)
const HYPE_WEIGHT: Decimal = Decimal::from_parts(4, 0, 0, false, 1);
/// Weight of the box-office index in the trend score (0.4)
const BOX_OFFICE_WEIGHT: Decimal = Decimal::from_parts(4, 0, 0, false, 1);
/// Weight of the word-of-mouth index in the trend score (0.2)
const WOM_WEIGHT: Decimal = Decimal::from_parts(2, 0, 0, false, 1);
/// Share of the previous price carried into the next one (0.8)
const PRICE_RETENTION: Decimal = Decimal::from_parts(8, 0, 0, false, 1);
/// Share of the trend score added on top (0.5)
const TREND_FACTOR: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// The three 0-100 signals blended into a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubIndices {
    pub hype: Decimal,
    pub box_office: Decimal,
    pub wom: Decimal,
}

/// Output of one blend step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendResult {
    pub new_price: Decimal,
    pub price_change_24h: Decimal,
}

/// Clamp a price into `[10, 1000]`
pub fn clamp_price(price: Decimal) -> Decimal {
    price.max(MIN_PRICE).min(MAX_PRICE)
}

/// Weighted trend score: `hype*0.4 + box_office*0.4 + wom*0.2`
pub fn trend_score(indices: &SubIndices) -> Decimal {
    indices.hype * HYPE_WEIGHT + indices.box_office * BOX_OFFICE_WEIGHT + indices.wom * WOM_WEIGHT
}

/// Calculate the next stock price.
///
/// The update is damped: 80% of the old price plus half the trend score,
/// which bounds how far a single step can move. The result is always clamped
/// to `[10, 1000]`, whatever the inputs.
///
/// # Arguments
/// * `old_price` - Current stock price
/// * `indices` - Hype, box-office and word-of-mouth indices (0-100)
pub fn calculate_new_price(old_price: Decimal, indices: &SubIndices) -> Decimal {
    let raw = old_price * PRICE_RETENTION + trend_score(indices) * TREND_FACTOR;
    clamp_price(raw)
}

/// Percentage change from `old_price` to `new_price`; 0 when `old_price` is 0
pub fn calculate_price_change_24h(new_price: Decimal, old_price: Decimal) -> Decimal {
    if old_price.is_zero() {
        return Decimal::ZERO;
    }
    (new_price - old_price) / old_price * Decimal::ONE_HUNDRED
}

/// Run one full blend step
pub fn blend(old_price: Decimal, indices: &SubIndices) -> BlendResult {
    let new_price = calculate_new_price(old_price, indices);
    BlendResult {
        new_price,
        price_change_24h: calculate_price_change_24h(new_price, old_price),
    }
}
