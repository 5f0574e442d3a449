//! Decimal amount parsing with per-token scaling.
//!
//! Native amounts scale by 10^18, USDC by 10^6. Parsing is exact: no
//! floating point is involved.

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tokens a student treasury can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Token {
    Eth,
    #[default]
    Usdc,
}

impl Token {
    pub fn decimals(self) -> u8 {
        match self {
            Token::Eth => 18,
            Token::Usdc => 6,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Token::Eth => "ETH",
            Token::Usdc => "USDC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Please enter an amount.")]
    Empty,

    #[error("'{0}' is not a valid amount")]
    Malformed(String),

    #[error("{symbol} supports at most {decimals} decimal places")]
    TooPrecise { symbol: &'static str, decimals: u8 },

    #[error("Amount must be greater than zero")]
    Zero,
}

/// A user-entered amount and its on-chain integer value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    /// The string as entered (trimmed).
    pub raw: String,
    pub token: Token,
    /// Value in the token's smallest unit.
    pub value: U256,
}

/// Parse a positive decimal string into the token's smallest unit.
pub fn parse_amount(input: &str, token: Token) -> Result<Amount, AmountError> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));
    let well_formed = !(whole.is_empty() && fraction.is_empty())
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction.chars().all(|c| c.is_ascii_digit());
    if !well_formed {
        return Err(AmountError::Malformed(raw.to_string()));
    }
    if fraction.len() > token.decimals() as usize {
        return Err(AmountError::TooPrecise {
            symbol: token.symbol(),
            decimals: token.decimals(),
        });
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let normalized = if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    };

    let value = parse_units(&normalized, token.decimals())
        .map_err(|_| AmountError::Malformed(raw.to_string()))?
        .get_absolute();
    if value.is_zero() {
        return Err(AmountError::Zero);
    }

    Ok(Amount {
        raw: raw.to_string(),
        token,
        value,
    })
}

/// Render a smallest-unit value as a decimal string without trailing zeros.
pub fn format_amount(value: U256, token: Token) -> String {
    let formatted = format_units(value, token.decimals()).unwrap_or_else(|_| value.to_string());
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                whole.to_string()
            } else {
                format!("{}.{}", whole, fraction)
            }
        }
        None => formatted,
    }
}

/// Native amount as a float, for USD display only.
pub fn eth_as_f64(wei: U256) -> f64 {
    format_amount(wei, Token::Eth).parse().unwrap_or(0.0)
}
