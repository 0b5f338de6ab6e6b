//! Ceremony Timestamp Types
//!
//! A point in a ceremony run, expressed both as a driver tick and as elapsed
//! time since the run started.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ceremony_events::CeremonyTimestamp;
//!
//! let ts = CeremonyTimestamp::new(40, Duration::from_millis(2_250));
//! assert_eq!(ts.tick, 40);
//! assert_eq!(ts.to_string(), "t+2.250s");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A point in ceremony time.
///
/// Ordering compares the tick first, then elapsed time, which matches
/// insertion order for records produced by a single driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct CeremonyTimestamp {
    /// Driver loop iteration that produced the record
    pub tick: u64,
    /// Time since the run started
    #[serde(with = "elapsed_secs")]
    pub elapsed: Duration,
}

impl CeremonyTimestamp {
    /// Creates a new CeremonyTimestamp.
    pub fn new(tick: u64, elapsed: Duration) -> Self {
        Self { tick, elapsed }
    }

    /// Timestamp at the very start of a run.
    pub fn start() -> Self {
        Self::default()
    }

    /// Elapsed time in fractional seconds.
    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

impl fmt::Display for CeremonyTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t+{:.3}s", self.elapsed.as_secs_f64())
    }
}

// Elapsed time travels as fractional seconds.
mod elapsed_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ts = CeremonyTimestamp::new(3, Duration::from_millis(150));
        assert_eq!(ts.to_string(), "t+0.150s");
        assert_eq!(CeremonyTimestamp::start().to_string(), "t+0.000s");
    }

    #[test]
    fn test_ordering_follows_tick_then_elapsed() {
        let a = CeremonyTimestamp::new(1, Duration::from_millis(50));
        let b = CeremonyTimestamp::new(2, Duration::from_millis(100));
        let c = CeremonyTimestamp::new(2, Duration::from_millis(120));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_serialization_uses_seconds() {
        let ts = CeremonyTimestamp::new(7, Duration::from_millis(1_500));
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, r#"{"tick":7,"elapsed":1.5}"#);

        let parsed: CeremonyTimestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_negative_elapsed_rejected() {
        let result: Result<CeremonyTimestamp, _> =
            serde_json::from_str(r#"{"tick":1,"elapsed":-2.0}"#);
        assert!(result.is_err());
    }
}
