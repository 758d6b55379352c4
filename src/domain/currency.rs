use serde::{Deserialize, Serialize};
use std::fmt;

/// A display currency the engine indexes into but never computes itself.
///
/// The engine persists only an index into an injected, pre-computed ordered
/// list; locale enumeration is explicitly out of scope, so the default list
/// here is a static table of common ISO 4217 codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub name: String,
}

impl Currency {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.name)
    }
}

/// The builtin ordered currency list. Index 0 is the default selection.
pub fn builtin_currencies() -> Vec<Currency> {
    [
        ("USD", "US Dollar"),
        ("EUR", "Euro"),
        ("GBP", "British Pound"),
        ("JPY", "Japanese Yen"),
        ("AUD", "Australian Dollar"),
        ("BRL", "Brazilian Real"),
        ("CAD", "Canadian Dollar"),
        ("CHF", "Swiss Franc"),
        ("CNY", "Chinese Yuan"),
        ("INR", "Indian Rupee"),
        ("KRW", "South Korean Won"),
        ("MXN", "Mexican Peso"),
        ("NOK", "Norwegian Krone"),
        ("NZD", "New Zealand Dollar"),
        ("PLN", "Polish Zloty"),
        ("SEK", "Swedish Krona"),
        ("SGD", "Singapore Dollar"),
        ("ZAR", "South African Rand"),
    ]
    .iter()
    .map(|(code, name)| Currency::new(code, name))
    .collect()
}
