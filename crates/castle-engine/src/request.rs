//! # Create-Deal Request
//!
//! The fully formed input a front-end collects before creating a deal.
//! Fields arrive as raw text; [`CreateDealRequest::terms`] trims and
//! validates them. The price accepts `.` or `,` as the decimal separator.
//! Currency symbols, signs and thousands separators are rejected instead of
//! being stripped.

use serde::{Deserialize, Serialize};

use castle_core::{Amount, UserId};
use castle_state::DealTerms;

use crate::error::EngineError;

/// A seller's request to open a new deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDealRequest {
    pub seller: UserId,
    pub item_type: String,
    pub item_name: String,
    pub description: String,
    pub price: String,
}

impl CreateDealRequest {
    pub fn new(
        seller: UserId,
        item_type: impl Into<String>,
        item_name: impl Into<String>,
        description: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Self {
            seller,
            item_type: item_type.into(),
            item_name: item_name.into(),
            description: description.into(),
            price: price.into(),
        }
    }

    /// Validated deal terms.
    pub fn terms(&self) -> Result<DealTerms, EngineError> {
        let price = Amount::parse(&self.price)?;
        Ok(DealTerms::new(
            &self.item_type,
            &self.item_name,
            &self.description,
            price,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn request(price: &str) -> CreateDealRequest {
        CreateDealRequest::new(UserId::new(1), "NFT", "Pepe", "Rare", price)
    }

    #[test]
    fn test_comma_decimal_price() {
        let terms = request("12,5").terms().unwrap();
        assert_eq!(terms.price(), Amount::from_micros(12_500_000).unwrap());
    }

    #[test]
    fn test_rejects_decorated_price() {
        for bad in ["100₽", "$100", "1 000", "abc", "", "-5"] {
            let err = request(bad).terms().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{bad:?}");
        }
    }

    #[test]
    fn test_rejects_zero_price() {
        for zero in ["0", "0.0", "0,000"] {
            let err = request(zero).terms().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{zero:?}");
        }
    }

    #[test]
    fn test_rejects_blank_item_fields() {
        let req = CreateDealRequest::new(UserId::new(1), " ", "Pepe", "Rare", "10");
        assert_eq!(req.terms().unwrap_err().kind(), ErrorKind::Validation);
    }
}
