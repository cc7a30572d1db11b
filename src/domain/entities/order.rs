use crate::domain::entities::market::Market;
use serde::{Deserialize, Serialize};

/// Order side in exchange notation (`bid` buys the base asset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Bid,
    Ask,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Bid => "bid",
            OrderSide::Ask => "ask",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Bid => write!(f, "BUY"),
            OrderSide::Ask => write!(f, "SELL"),
        }
    }
}

/// `price` is a market buy sized in quote currency, `market` a market sell
/// sized in base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Price,
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Price => "price",
            OrderType::Market => "market",
        }
    }
}

/// Market order ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub market: Market,
    pub side: OrderSide,
    pub ord_type: OrderType,
    /// Quote amount to spend (market buys)
    pub price: Option<f64>,
    /// Base amount to sell (market sells)
    pub volume: Option<f64>,
}

impl OrderRequest {
    pub fn market_buy(market: Market, quote_amount: f64) -> Result<Self, String> {
        if !quote_amount.is_finite() || quote_amount <= 0.0 {
            return Err(format!("Invalid buy amount: {}", quote_amount));
        }
        Ok(Self {
            market,
            side: OrderSide::Bid,
            ord_type: OrderType::Price,
            price: Some(quote_amount),
            volume: None,
        })
    }

    pub fn market_sell(market: Market, base_amount: f64) -> Result<Self, String> {
        if !base_amount.is_finite() || base_amount <= 0.0 {
            return Err(format!("Invalid sell volume: {}", base_amount));
        }
        Ok(Self {
            market,
            side: OrderSide::Ask,
            ord_type: OrderType::Market,
            price: None,
            volume: Some(base_amount),
        })
    }

    /// Request parameters in submission order. The same list is signed
    /// (query hash) and sent as the body.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("market", self.market.code()),
            ("side", self.side.as_str().to_string()),
            ("ord_type", self.ord_type.as_str().to_string()),
        ];
        if let Some(price) = self.price {
            // Quote amounts are whole KRW
            params.push(("price", format!("{:.0}", price.floor())));
        }
        if let Some(volume) = self.volume {
            params.push(("volume", format_volume(volume)));
        }
        params
    }
}

/// Base volume truncated (never rounded up) to 8 decimals, so a sell of
/// the whole balance never asks for more than is held.
fn format_volume(volume: f64) -> String {
    // Clear float noise below the 8th decimal before truncating
    let units = (volume * 1e11).round() / 1e3;
    format!("{:.8}", units.floor() / 1e8)
}

/// Exchange acknowledgement of a submitted order
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderReceipt {
    pub uuid: String,
    pub side: String,
    pub ord_type: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_buy_params() {
        let order = OrderRequest::market_buy(Market::default(), 49_975.4).unwrap();
        assert_eq!(
            order.params(),
            vec![
                ("market", "KRW-BTC".to_string()),
                ("side", "bid".to_string()),
                ("ord_type", "price".to_string()),
                ("price", "49975".to_string()),
            ]
        );
    }

    #[test]
    fn test_market_sell_params() {
        let order = OrderRequest::market_sell(Market::default(), 0.0125).unwrap();
        let params = order.params();
        assert_eq!(params[1], ("side", "ask".to_string()));
        assert_eq!(params[2], ("ord_type", "market".to_string()));
        assert_eq!(params[3], ("volume", "0.01250000".to_string()));
    }

    #[test]
    fn test_sell_volume_is_truncated_not_rounded() {
        let order = OrderRequest::market_sell(Market::default(), 0.123456789).unwrap();
        assert_eq!(order.params()[3], ("volume", "0.12345678".to_string()));

        let order = OrderRequest::market_sell(Market::default(), 0.999999999).unwrap();
        assert_eq!(order.params()[3], ("volume", "0.99999999".to_string()));

        let order = OrderRequest::market_sell(Market::default(), 0.005).unwrap();
        assert_eq!(order.params()[3], ("volume", "0.00500000".to_string()));
    }

    #[test]
    fn test_rejects_non_positive_amounts() {
        assert!(OrderRequest::market_buy(Market::default(), 0.0).is_err());
        assert!(OrderRequest::market_sell(Market::default(), -1.0).is_err());
        assert!(OrderRequest::market_sell(Market::default(), f64::NAN).is_err());
    }

    #[test]
    fn test_receipt_deserialization() {
        let json = r#"{
            "uuid": "cdd92199-2897-4e14-9448-f923320408ad",
            "side": "bid",
            "ord_type": "price",
            "price": "49975",
            "state": "wait",
            "market": "KRW-BTC",
            "created_at": "2024-01-01T00:00:00+09:00"
        }"#;
        let receipt: OrderReceipt = serde_json::from_str(json).unwrap();
        assert_eq!(receipt.uuid, "cdd92199-2897-4e14-9448-f923320408ad");
        assert_eq!(receipt.state.as_deref(), Some("wait"));
    }

    #[test]
    fn test_side_display() {
        assert_eq!(OrderSide::Bid.to_string(), "BUY");
        assert_eq!(OrderSide::Ask.to_string(), "SELL");
    }
}
