//! Delivery options and their cost policies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::PricingError;

/// Flat rate for next-day courier delivery
pub const EXPRESS_24H_COST: f64 = 20.0;

/// Flat rate for two-day courier delivery
pub const EXPRESS_48H_COST: f64 = 15.0;

/// Post cost below [`POST_THRESHOLD`] in the single-print calculator
pub const POST_COST_SMALL_ORDER: f64 = 7.0;

/// Post cost from [`POST_THRESHOLD`] upwards in the single-print calculator
pub const POST_COST_LARGE_ORDER: f64 = 5.0;

/// Subtotal (before delivery) from which the cheaper post rate applies
pub const POST_THRESHOLD: f64 = 50.0;

/// How the finished prints reach the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeliveryType {
    /// Customer picks up
    #[default]
    #[serde(rename = "afhaling")]
    Pickup,
    /// Regular post
    #[serde(rename = "post")]
    Post,
    /// Courier, next day
    #[serde(rename = "24h")]
    Express24h,
    /// Courier, two days
    #[serde(rename = "48h")]
    Express48h,
}

impl DeliveryType {
    pub const ALL: [DeliveryType; 4] = [
        DeliveryType::Pickup,
        DeliveryType::Post,
        DeliveryType::Express24h,
        DeliveryType::Express48h,
    ];

    /// Wire code ("afhaling", "post", "24h", "48h")
    pub fn code(&self) -> &'static str {
        match self {
            DeliveryType::Pickup => "afhaling",
            DeliveryType::Post => "post",
            DeliveryType::Express24h => "24h",
            DeliveryType::Express48h => "48h",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DeliveryType::Pickup => "pickup",
            DeliveryType::Post => "post",
            DeliveryType::Express24h => "24h courier",
            DeliveryType::Express48h => "48h courier",
        }
    }

    /// Delivery cost in the single-print calculator: post uses the 7/5 rule
    /// around [`POST_THRESHOLD`].
    pub fn single_print_cost(&self, subtotal_before_delivery: f64) -> f64 {
        match self {
            DeliveryType::Post => {
                if subtotal_before_delivery < POST_THRESHOLD {
                    POST_COST_SMALL_ORDER
                } else {
                    POST_COST_LARGE_ORDER
                }
            }
            other => other.flat_cost(0.0),
        }
    }

    /// Delivery cost at quote level: post uses the configured post cost.
    pub fn flat_cost(&self, post_cost: f64) -> f64 {
        match self {
            DeliveryType::Pickup => 0.0,
            DeliveryType::Post => post_cost,
            DeliveryType::Express24h => EXPRESS_24H_COST,
            DeliveryType::Express48h => EXPRESS_48H_COST,
        }
    }
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for DeliveryType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "afhaling" => Ok(DeliveryType::Pickup),
            "post" => Ok(DeliveryType::Post),
            "24h" => Ok(DeliveryType::Express24h),
            "48h" => Ok(DeliveryType::Express48h),
            _ => Err(PricingError::InvalidDeliveryType {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_threshold_boundary() {
        assert_eq!(DeliveryType::Post.single_print_cost(49.99), 7.0);
        assert_eq!(DeliveryType::Post.single_print_cost(50.0), 5.0);
        assert_eq!(DeliveryType::Post.single_print_cost(50.01), 5.0);
    }

    #[test]
    fn test_flat_costs() {
        assert_eq!(DeliveryType::Pickup.single_print_cost(10.0), 0.0);
        assert_eq!(DeliveryType::Express24h.single_print_cost(10.0), 20.0);
        assert_eq!(DeliveryType::Express48h.single_print_cost(10.0), 15.0);
        assert_eq!(DeliveryType::Post.flat_cost(6.5), 6.5);
    }

    #[test]
    fn test_parse_codes() {
        for delivery in DeliveryType::ALL {
            assert_eq!(delivery.code().parse::<DeliveryType>().unwrap(), delivery);
        }
        assert_eq!(" POST ".parse::<DeliveryType>().unwrap(), DeliveryType::Post);
        assert!("drone".parse::<DeliveryType>().is_err());
    }

    #[test]
    fn test_serde_codes() {
        assert_eq!(serde_json::to_string(&DeliveryType::Express24h).unwrap(), "\"24h\"");
        let pickup: DeliveryType = serde_json::from_str("\"afhaling\"").unwrap();
        assert_eq!(pickup, DeliveryType::Pickup);
    }
}
