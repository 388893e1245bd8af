use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Locales the catalog carries messages for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "tr-TR")]
    TrTr,
}

/// Locale used when the caller sent none, sent an unknown one, or when a
/// message has no entry for the requested locale.
pub const DEFAULT_LOCALE: Locale = Locale::TrTr;

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::EnUs, Locale::TrTr];

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::EnUs => "en-US",
            Locale::TrTr => "tr-TR",
        }
    }

    /// Exact, case-sensitive parse of a locale tag.
    pub fn parse(raw: &str) -> Option<Locale> {
        Locale::ALL.into_iter().find(|l| l.as_str() == raw)
    }
}

impl Default for Locale {
    fn default() -> Self {
        DEFAULT_LOCALE
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::parse(s).ok_or_else(|| UnknownLocale(s.to_string()))
    }
}
