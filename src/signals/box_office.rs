use super::{BoxOfficeSource, SignalError};
use crate::models::MovieStock;
use crate::pricing::NEUTRAL_INDEX;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Box-office strategy used until a real revenue feed exists.
///
/// Every movie gets the neutral index. A real source replaces this by
/// implementing `BoxOfficeSource` and being handed to the aggregator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralBoxOffice;

#[async_trait]
impl BoxOfficeSource for NeutralBoxOffice {
    async fn box_office_index(&self, _stock: &MovieStock) -> Result<Decimal, SignalError> {
        Ok(NEUTRAL_INDEX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StockStatus;

    #[tokio::test]
    async fn test_neutral_for_every_stock() {
        let source = NeutralBoxOffice;
        for id in ["550", "278", "upcoming-1"] {
            let stock = MovieStock::new(id, "Any", Decimal::new(100, 0), StockStatus::Active);
            let index = source.box_office_index(&stock).await.unwrap();
            assert_eq!(index, Decimal::new(50, 0));
        }
    }
}
