use std::str::FromStr;

/// Exchanges speaking the `/v1` REST dialect (accounts, ticker, orderbook,
/// candles, orders) with JWT bearer authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    Bithumb,
    Upbit,
}

impl Exchange {
    pub fn name(&self) -> &str {
        match self {
            Exchange::Bithumb => "bithumb",
            Exchange::Upbit => "upbit",
        }
    }

    pub fn api_base(&self) -> &'static str {
        match self {
            Exchange::Bithumb => "https://api.bithumb.com",
            Exchange::Upbit => "https://api.upbit.com",
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bithumb" => Ok(Exchange::Bithumb),
            "upbit" => Ok(Exchange::Upbit),
            other => Err(format!("Unsupported exchange: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_name() {
        assert_eq!(Exchange::Bithumb.name(), "bithumb");
        assert_eq!(Exchange::Upbit.name(), "upbit");
    }

    #[test]
    fn test_exchange_from_str() {
        assert_eq!("Bithumb".parse::<Exchange>().unwrap(), Exchange::Bithumb);
        assert_eq!(" upbit ".parse::<Exchange>().unwrap(), Exchange::Upbit);
        assert!("binance".parse::<Exchange>().is_err());
    }

    #[test]
    fn test_exchange_api_base() {
        assert_eq!(Exchange::Bithumb.api_base(), "https://api.bithumb.com");
        assert_eq!(Exchange::Upbit.api_base(), "https://api.upbit.com");
    }
}
