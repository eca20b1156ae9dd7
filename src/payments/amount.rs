//! cUSD amount handling
//!
//! Amounts are carried as integer wei (18 decimals) so no floating point
//! ever touches money. Parsing and formatting round-trip decimal strings
//! losslessly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// cUSD uses 18 decimals like the native token
pub const CUSD_DECIMALS: u32 = 18;

const WEI_PER_CUSD: u128 = 10u128.pow(CUSD_DECIMALS);

/// A cUSD amount in wei
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(0);

    pub const fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    /// Whole-cUSD constructor for catalog prices and presets
    pub const fn from_cusd(whole: u64) -> Self {
        Self(whole as u128 * WEI_PER_CUSD)
    }

    pub const fn wei(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a decimal cUSD string ("5", "0.01", "12.5") into wei
    ///
    /// Rejects empty input, more than 18 fractional digits, and anything
    /// that is not plain unsigned decimal.
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        if input.is_empty() {
            return Err("Amount is empty".to_string());
        }

        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(format!("Invalid amount: {}", input));
        }
        if frac.len() as u32 > CUSD_DECIMALS {
            return Err(format!(
                "Amount has more than {} decimal places: {}",
                CUSD_DECIMALS, input
            ));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("Invalid amount: {}", input));
        }

        let whole_part: u128 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| format!("Amount out of range: {}", input))?
        };

        let frac_part: u128 = if frac.is_empty() {
            0
        } else {
            let parsed: u128 = frac
                .parse()
                .map_err(|_| format!("Amount out of range: {}", input))?;
            parsed * 10u128.pow(CUSD_DECIMALS - frac.len() as u32)
        };

        whole_part
            .checked_mul(WEI_PER_CUSD)
            .and_then(|w| w.checked_add(frac_part))
            .map(TokenAmount)
            .ok_or_else(|| format!("Amount out of range: {}", input))
    }
}

impl fmt::Display for TokenAmount {
    /// Lossless decimal rendering with trailing fraction zeros trimmed
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WEI_PER_CUSD;
        let frac = self.0 % WEI_PER_CUSD;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let frac = format!("{:018}", frac);
        write!(f, "{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl FromStr for TokenAmount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
