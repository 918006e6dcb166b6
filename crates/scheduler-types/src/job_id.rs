//! Opaque job identifier.
//!
//! Rendered externally as an 8-character lowercase hex string. Arithmetic
//! beyond increment is intentionally not exposed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A 32-bit monotonically allocated job identifier.
///
/// Serializes as its 8-character hex string, never as the raw integer, so
/// every JSON-carrying field that holds one round-trips through the same
/// wire format callers see in `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct JobId(u32);

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for JobId {
    type Error = JobIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid job id: {0:?} (expected 8 lowercase hex characters)")]
pub struct JobIdParseError(String);

impl JobId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// The next id in allocation order. Used only by the persistence backend's
    /// id generator; callers never need to construct one themselves.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl FromStr for JobId {
    type Err = JobIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(JobIdParseError(s.to_string()));
        }
        u32::from_str_radix(s, 16)
            .map(JobId)
            .map_err(|_| JobIdParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display() {
        let id = JobId::new(0x1a2b_3c4d);
        let rendered = id.to_string();
        assert_eq!(rendered, "1a2b3c4d");
        assert_eq!(rendered.parse::<JobId>().unwrap(), id);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("1A2B3C4D".parse::<JobId>().unwrap(), JobId::new(0x1a2b3c4d));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("abc".parse::<JobId>().is_err());
        assert!("1a2b3c4d5".parse::<JobId>().is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert!("zzzzzzzz".parse::<JobId>().is_err());
    }

    #[test]
    fn next_increments() {
        assert_eq!(JobId::new(5).next(), JobId::new(6));
    }

    #[test]
    fn serializes_as_hex_string_not_raw_integer() {
        let id = JobId::new(0x1a2b_3c4d);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1a2b3c4d\"");
        assert_eq!(serde_json::from_str::<JobId>("\"1a2b3c4d\"").unwrap(), id);
    }
}
