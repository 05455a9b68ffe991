//! Fixed-point USDC amount type.
//!
//! USDC carries 6 decimal places on every chain this crate touches, so
//! amounts are held as integer micro-units in a [`U256`]. Parsing and
//! display use plain decimal strings ("10.50"), which is also the format
//! used in the configuration TOML and the persisted history document.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Number of decimal places in USDC's fixed-point representation.
pub const USDC_DECIMALS: u32 = 6;

const MICRO_PER_WHOLE: u64 = 1_000_000;

/// A USDC amount in micro-units (6 decimals).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Usdc(pub U256);

impl Usdc {
    pub const ZERO: Self = Self(U256::ZERO);

    /// Creates an amount directly from micro-units.
    pub fn from_micros(micros: u64) -> Self {
        Self(U256::from(micros))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<Usdc> for U256 {
    fn from(value: Usdc) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidUsdcError {
    #[error("empty USDC amount")]
    Empty,
    #[error("invalid USDC amount {value:?}: not a decimal number")]
    NotANumber { value: String },
    #[error("USDC amounts cannot be negative: {value:?}")]
    Negative { value: String },
    #[error("USDC supports at most 6 decimal places, got {places} in {value:?}")]
    TooManyDecimals { value: String, places: usize },
}

impl FromStr for Usdc {
    type Err = InvalidUsdcError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(InvalidUsdcError::Empty);
        }
        if trimmed.starts_with('-') {
            return Err(InvalidUsdcError::Negative {
                value: value.to_string(),
            });
        }

        let (whole, frac) = match trimmed.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (trimmed, ""),
        };

        if frac.len() > USDC_DECIMALS as usize {
            return Err(InvalidUsdcError::TooManyDecimals {
                value: value.to_string(),
                places: frac.len(),
            });
        }

        let parse_digits = |digits: &str| -> Result<U256, InvalidUsdcError> {
            if digits.is_empty() {
                return Ok(U256::ZERO);
            }
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(InvalidUsdcError::NotANumber {
                    value: value.to_string(),
                });
            }
            U256::from_str_radix(digits, 10).map_err(|_| InvalidUsdcError::NotANumber {
                value: value.to_string(),
            })
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(InvalidUsdcError::NotANumber {
                value: value.to_string(),
            });
        }

        let whole_units = parse_digits(whole)?;
        let frac_scale = 10u64.pow(USDC_DECIMALS - frac.len() as u32);
        let frac_units = parse_digits(frac)? * U256::from(frac_scale);

        Ok(Self(
            whole_units * U256::from(MICRO_PER_WHOLE) + frac_units,
        ))
    }
}

impl TryFrom<String> for Usdc {
    type Error = InvalidUsdcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Usdc> for String {
    fn from(value: Usdc) -> Self {
        value.to_string()
    }
}

impl Display for Usdc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let micro = U256::from(MICRO_PER_WHOLE);
        let whole = self.0 / micro;
        let frac = (self.0 % micro).to::<u64>();

        if frac == 0 {
            return write!(f, "{whole}");
        }

        let frac_str = format!("{frac:06}");
        write!(f, "{whole}.{}", frac_str.trim_end_matches('0'))
    }
}
