//! Serde helpers for human-readable durations in configuration.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::{fmt, time::Duration};

/// Custom serde functions for Duration that support human-readable strings
pub mod duration {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration_str = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&duration_str)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl Visitor<'_> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str(
                    "a duration as seconds (number) or human-readable string (e.g., '3s', '500ms', '1m')",
                )
            }

            fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Duration::from_secs(seconds))
            }

            fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(seconds)
                    .map(Duration::from_secs)
                    .map_err(|_| de::Error::custom(format!("Negative duration: {seconds}")))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                humantime::parse_duration(value)
                    .map_err(|e| de::Error::custom(format!("Invalid duration '{value}': {e}")))
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super::duration")]
        value: Duration,
    }

    #[test]
    fn accepts_plain_seconds() {
        let parsed: Wrapper = toml::from_str("value = 5").unwrap();
        assert_eq!(parsed.value, Duration::from_secs(5));
    }

    #[test]
    fn accepts_humantime_strings() {
        let parsed: Wrapper = toml::from_str("value = \"1500ms\"").unwrap();
        assert_eq!(parsed.value, Duration::from_millis(1500));
    }

    #[test]
    fn rejects_garbage() {
        assert!(toml::from_str::<Wrapper>("value = \"soon\"").is_err());
        assert!(toml::from_str::<Wrapper>("value = -3").is_err());
    }

    #[test]
    fn serializes_human_readable() {
        let out = toml::to_string(&Wrapper {
            value: Duration::from_secs(3),
        })
        .unwrap();
        assert!(out.contains("\"3s\""));
    }
}
