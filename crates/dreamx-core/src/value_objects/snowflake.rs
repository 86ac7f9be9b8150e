//! Snowflake ID - time-ordered 64-bit identifier used for every row
//!
//! Layout:
//! - Bits 63-22: milliseconds since [`Snowflake::EPOCH`]
//! - Bits 21-12: worker id (0-1023)
//! - Bits 11-0:  per-millisecond sequence (0-4095)

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

const WORKER_BITS: i64 = 10;
const SEQUENCE_BITS: i64 = 12;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;
const MAX_WORKER_ID: u16 = 1 << WORKER_BITS;

/// Time-ordered unique identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Snowflake(i64);

impl Snowflake {
    /// Custom epoch: 2024-01-01 00:00:00 UTC (milliseconds)
    pub const EPOCH: i64 = 1_704_067_200_000;

    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn into_inner(self) -> i64 {
        self.0
    }

    /// Milliseconds since the Unix epoch at which the id was minted
    #[inline]
    pub fn timestamp(&self) -> i64 {
        (self.0 >> (WORKER_BITS + SEQUENCE_BITS)) + Self::EPOCH
    }

    #[inline]
    pub fn worker_id(&self) -> u16 {
        ((self.0 >> SEQUENCE_BITS) & i64::from(MAX_WORKER_ID - 1)) as u16
    }

    /// Creation time derived from the embedded timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp())
            .single()
            .unwrap_or_default()
    }

    pub fn parse(s: &str) -> Result<Self, SnowflakeParseError> {
        s.trim()
            .parse::<i64>()
            .map(Snowflake)
            .map_err(|_| SnowflakeParseError::InvalidFormat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SnowflakeParseError {
    #[error("invalid snowflake format")]
    InvalidFormat,
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Snowflake {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<Snowflake> for i64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

impl std::str::FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Snowflake::parse(s)
    }
}

// Strings on the wire keep 64-bit ids intact in JavaScript clients
impl Serialize for Snowflake {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct SnowflakeVisitor;

        impl Visitor<'_> for SnowflakeVisitor {
            type Value = Snowflake;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer id")
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Snowflake, E> {
                Ok(Snowflake(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Snowflake, E> {
                i64::try_from(value)
                    .map(Snowflake)
                    .map_err(|_| de::Error::custom("id out of range"))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Snowflake, E> {
                Snowflake::parse(value).map_err(|_| de::Error::custom("invalid id string"))
            }
        }

        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

/// Lock-free id generator
///
/// The last issued id is kept in a single atomic, so concurrent callers
/// always observe strictly increasing values.
#[derive(Debug)]
pub struct SnowflakeGenerator {
    worker_id: u16,
    last: AtomicI64,
}

impl SnowflakeGenerator {
    /// Create a generator for `worker_id`; values >= 1024 are folded into range
    pub fn new(worker_id: u16) -> Self {
        Self {
            worker_id: worker_id % MAX_WORKER_ID,
            last: AtomicI64::new(0),
        }
    }

    pub fn generate(&self) -> Snowflake {
        let worker = i64::from(self.worker_id) << SEQUENCE_BITS;
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let now = (Utc::now().timestamp_millis() - Snowflake::EPOCH).max(0);
            let last_millis = last >> (WORKER_BITS + SEQUENCE_BITS);

            // Clock going backwards or sequence exhausted: borrow from the last millisecond
            let candidate = if now > last_millis {
                (now << (WORKER_BITS + SEQUENCE_BITS)) | worker
            } else {
                let seq = (last & SEQUENCE_MASK) + 1;
                if seq > SEQUENCE_MASK {
                    ((last_millis + 1) << (WORKER_BITS + SEQUENCE_BITS)) | worker
                } else {
                    (last_millis << (WORKER_BITS + SEQUENCE_BITS)) | worker | seq
                }
            };

            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Snowflake(candidate),
                Err(observed) => last = observed,
            }
        }
    }

    pub fn worker_id(&self) -> u16 {
        self.worker_id
    }
}

impl Default for SnowflakeGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_snowflake_parse() {
        assert_eq!(Snowflake::parse("123456789").unwrap().into_inner(), 123_456_789);
        assert!(Snowflake::parse("abc").is_err());
    }

    #[test]
    fn test_snowflake_serializes_as_string() {
        let json = serde_json::to_string(&Snowflake::new(123_456_789_012_345_678)).unwrap();
        assert_eq!(json, "\"123456789012345678\"");
    }

    #[test]
    fn test_snowflake_deserializes_from_string_or_number() {
        let a: Snowflake = serde_json::from_str("\"42\"").unwrap();
        let b: Snowflake = serde_json::from_str("42").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_generator_is_monotonic_and_unique() {
        let gen = SnowflakeGenerator::new(3);
        let mut last = Snowflake::default();
        for _ in 0..10_000 {
            let id = gen.generate();
            assert!(id > last);
            assert_eq!(id.worker_id(), 3);
            last = id;
        }
    }

    #[test]
    fn test_generator_thread_safety() {
        let gen = Arc::new(SnowflakeGenerator::new(1));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gen = Arc::clone(&gen);
                thread::spawn(move || (0..1000).map(|_| gen.generate()).collect::<Vec<_>>())
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.extend(handle.join().unwrap());
        }
        assert_eq!(ids.len(), 4000);
    }

    #[test]
    fn test_created_at_tracks_generation_time() {
        let before = Utc::now() - chrono::Duration::seconds(1);
        let id = SnowflakeGenerator::new(0).generate();
        assert!(id.created_at() >= before);
    }
}
