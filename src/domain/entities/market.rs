use std::str::FromStr;

/// Trading pair in exchange notation, quote first: `KRW-BTC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Market {
    pub quote: String,
    pub base: String,
}

impl Market {
    pub fn new(quote: &str, base: &str) -> Self {
        Self {
            quote: quote.to_uppercase(),
            base: base.to_uppercase(),
        }
    }

    pub fn code(&self) -> String {
        format!("{}-{}", self.quote, self.base)
    }
}

impl Default for Market {
    fn default() -> Self {
        Market::new("KRW", "BTC")
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.quote, self.base)
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('-') {
            Some((quote, base)) if !quote.is_empty() && !base.is_empty() => {
                Ok(Market::new(quote, base))
            }
            _ => Err(format!(
                "Invalid market '{}': expected QUOTE-BASE (e.g. KRW-BTC)",
                s
            )),
        }
    }
}

/// Candle aggregation interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleInterval {
    Day,
    Minutes(u32),
}

impl CandleInterval {
    /// Path segment under `/v1/candles/`
    pub fn path(&self) -> String {
        match self {
            CandleInterval::Day => "days".to_string(),
            CandleInterval::Minutes(unit) => format!("minutes/{}", unit),
        }
    }
}

impl std::fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandleInterval::Day => write!(f, "1d"),
            CandleInterval::Minutes(unit) => write!(f, "{}m", unit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_code() {
        let market = Market::new("krw", "btc");
        assert_eq!(market.code(), "KRW-BTC");
        assert_eq!(market.to_string(), "KRW-BTC");
    }

    #[test]
    fn test_market_parse() {
        let market: Market = "KRW-ETH".parse().unwrap();
        assert_eq!(market.quote, "KRW");
        assert_eq!(market.base, "ETH");
        assert!("KRWBTC".parse::<Market>().is_err());
        assert!("-BTC".parse::<Market>().is_err());
    }

    #[test]
    fn test_candle_interval_path() {
        assert_eq!(CandleInterval::Day.path(), "days");
        assert_eq!(CandleInterval::Minutes(60).path(), "minutes/60");
    }
}
