use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Mt5AgentError;

/// MT5 chart timeframes supported by the rate operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Timeframe {
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    M10,
    M12,
    M15,
    M20,
    M30,
    H1,
    H2,
    H3,
    H4,
    H6,
    H8,
    H12,
    D1,
    W1,
    MN1,
}

impl Timeframe {
    /// All supported timeframes, in ascending granularity order.
    pub const ALL: [Timeframe; 21] = [
        Timeframe::M1,
        Timeframe::M2,
        Timeframe::M3,
        Timeframe::M4,
        Timeframe::M5,
        Timeframe::M6,
        Timeframe::M10,
        Timeframe::M12,
        Timeframe::M15,
        Timeframe::M20,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H3,
        Timeframe::H4,
        Timeframe::H6,
        Timeframe::H8,
        Timeframe::H12,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::MN1,
    ];

    /// The timeframe's wire name, e.g. `"H1"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "M1",
            Timeframe::M2 => "M2",
            Timeframe::M3 => "M3",
            Timeframe::M4 => "M4",
            Timeframe::M5 => "M5",
            Timeframe::M6 => "M6",
            Timeframe::M10 => "M10",
            Timeframe::M12 => "M12",
            Timeframe::M15 => "M15",
            Timeframe::M20 => "M20",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H2 => "H2",
            Timeframe::H3 => "H3",
            Timeframe::H4 => "H4",
            Timeframe::H6 => "H6",
            Timeframe::H8 => "H8",
            Timeframe::H12 => "H12",
            Timeframe::D1 => "D1",
            Timeframe::W1 => "W1",
            Timeframe::MN1 => "MN1",
        }
    }

    /// Wire names of all supported timeframes, for schema enum lists.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Timeframe::as_str).collect()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = Mt5AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|tf| tf.as_str() == s)
            .copied()
            .ok_or_else(|| Mt5AgentError::Validation(format!("unknown timeframe '{s}'")))
    }
}

/// Direction of a trading operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    /// Long.
    Buy,
    /// Short.
    Sell,
}

impl OrderSide {
    /// The side's wire name, `"BUY"` or `"SELL"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category tag grouping skills in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    /// Account and terminal information.
    Account,
    /// Symbols, ticks, and OHLCV rates.
    MarketData,
    /// Orders, positions, and trade management.
    Trading,
    /// Margin, profit, volume, and spread calculations.
    Analysis,
}

impl SkillCategory {
    /// The category's wire name, e.g. `"market_data"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Account => "account",
            SkillCategory::MarketData => "market_data",
            SkillCategory::Trading => "trading",
            SkillCategory::Analysis => "analysis",
        }
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillCategory {
    type Err = Mt5AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "account" => Ok(SkillCategory::Account),
            "market_data" => Ok(SkillCategory::MarketData),
            "trading" => Ok(SkillCategory::Trading),
            "analysis" => Ok(SkillCategory::Analysis),
            other => Err(Mt5AgentError::Validation(format!(
                "unknown skill category '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_wire_names_roundtrip() {
        for tf in Timeframe::ALL {
            let parsed: Timeframe = tf.as_str().parse().unwrap();
            assert_eq!(parsed, tf);
        }
        assert!("H7".parse::<Timeframe>().is_err());
    }

    #[test]
    fn timeframe_serde_uses_wire_names() {
        let json = serde_json::to_string(&Timeframe::H4).unwrap();
        assert_eq!(json, "\"H4\"");
        let tf: Timeframe = serde_json::from_str("\"MN1\"").unwrap();
        assert_eq!(tf, Timeframe::MN1);
    }

    #[test]
    fn order_side_serde_is_uppercase() {
        assert_eq!(serde_json::to_string(&OrderSide::Buy).unwrap(), "\"BUY\"");
        let side: OrderSide = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(side, OrderSide::Sell);
    }

    #[test]
    fn category_parse_and_display() {
        let cat: SkillCategory = "market_data".parse().unwrap();
        assert_eq!(cat, SkillCategory::MarketData);
        assert_eq!(cat.to_string(), "market_data");
        assert!("markets".parse::<SkillCategory>().is_err());
    }
}
