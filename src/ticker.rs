//! Ticker symbols stored inline.

use std::fmt;

/// Maximum ticker length in bytes (`"BPAC11.SA"` is 9).
pub const MAX_TICKER_LEN: usize = 16;

/// An exchange ticker such as `PETR4.SA`, stored inline so it is `Copy`.
///
/// Unused trailing bytes are zero, so derived ordering and hashing match
/// the string ordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticker {
    bytes: [u8; MAX_TICKER_LEN],
    len: u8,
}

impl Ticker {
    /// Create a ticker.
    ///
    /// # Panics
    ///
    /// Panics if `s` is longer than [`MAX_TICKER_LEN`] bytes.
    pub fn new(s: &str) -> Self {
        match Self::try_new(s) {
            Some(t) => t,
            None => panic!("ticker '{s}' exceeds {MAX_TICKER_LEN} bytes"),
        }
    }

    /// Create a ticker, returning `None` if `s` is too long.
    pub fn try_new(s: &str) -> Option<Self> {
        let raw = s.as_bytes();
        if raw.len() > MAX_TICKER_LEN {
            return None;
        }
        let mut bytes = [0u8; MAX_TICKER_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Some(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    /// The ticker as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ever built from a `&str` prefix.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ticker({})", self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Ticker {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Ticker {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ticker::try_new(s.trim()).ok_or_else(|| {
            serde::de::Error::custom(format!("ticker '{s}' exceeds {MAX_TICKER_LEN} bytes"))
        })
    }
}
