//! Pure price math: the sub-index formulas and the price blend.
//!
//! Nothing in here performs I/O; the services feed it signals and persist
//! what it returns.

pub mod blender;
pub mod indices;

pub use blender::{
    blend, calculate_new_price, calculate_price_change_24h, clamp_price, trend_score, BlendResult,
    SubIndices,
};
pub use indices::{hype_index_from_popularity, wom_index_from_ratings, POPULARITY_SATURATION};

use rust_decimal::Decimal;

/// Value substituted for any sub-index whose source is unavailable
pub const NEUTRAL_INDEX: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Lower bound of every stock price
pub const MIN_PRICE: Decimal = Decimal::TEN;

/// Upper bound of every stock price
pub const MAX_PRICE: Decimal = Decimal::ONE_THOUSAND;

/// Upper bound of every sub-index
pub const MAX_INDEX: Decimal = Decimal::ONE_HUNDRED;
