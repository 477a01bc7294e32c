//! Supported currency codes
//!
//! Accounts and transfers are denominated in one of a fixed set of
//! three-letter codes. Amounts are always integers in the currency's
//! smallest unit; no conversion between currencies exists.

use super::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Three-letter currency code accepted by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Inr,
    Yen,
    Cad,
    Bdt,
    Brl,
    Fjd,
}

impl Currency {
    /// Every supported currency, in declaration order
    pub const ALL: [Currency; 8] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Inr,
        Currency::Yen,
        Currency::Cad,
        Currency::Bdt,
        Currency::Brl,
        Currency::Fjd,
    ];

    /// The canonical upper-case code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Inr => "INR",
            Currency::Yen => "YEN",
            Currency::Cad => "CAD",
            Currency::Bdt => "BDT",
            Currency::Brl => "BRL",
            Currency::Fjd => "FJD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    /// Codes are matched exactly after trimming; `usd` is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Currency::ALL
            .into_iter()
            .find(|currency| currency.code() == code)
            .ok_or_else(|| LedgerError::invalid_currency(code))
    }
}
