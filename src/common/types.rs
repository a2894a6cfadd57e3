use std::{fmt, str::FromStr, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A thread-safe, read-write shared component.
pub type SharedRw<T> = Arc<RwLock<T>>;

/// A generic boxed error type.
pub type AnyError = Box<dyn std::error::Error + Send + Sync>;

/// A convenient Result alias returning `AnyError`.
pub type AnyResult<T> = std::result::Result<T, AnyError>;

/// Declares a Discord snowflake newtype.
///
/// Discord sends snowflakes as JSON strings; numbers are accepted too so
/// config files can use plain integers.
macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }

            pub fn is_unset(self) -> bool {
                self.0 == 0
            }
        }

        impl From<u64> for $name {
            fn from(u: u64) -> Self {
                Self(u)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserialize_snowflake(deserializer).map(Self)
            }
        }
    };
}

snowflake!(
    /// Discord user identifier.
    UserId
);
snowflake!(
    /// Discord channel identifier.
    ChannelId
);
snowflake!(
    /// Discord guild (server) identifier.
    GuildId
);
snowflake!(
    /// Discord application identifier, used for command registration.
    ApplicationId
);

fn deserialize_snowflake<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflake_accepts_string_and_number() {
        let a: UserId = serde_json::from_str("\"80351110224678912\"").unwrap();
        let b: UserId = serde_json::from_str("80351110224678912").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.get(), 80351110224678912);
    }

    #[test]
    fn snowflake_serializes_as_string() {
        let json = serde_json::to_string(&ChannelId(42)).unwrap();
        assert_eq!(json, "\"42\"");
    }

    #[test]
    fn snowflake_rejects_garbage() {
        assert!(serde_json::from_str::<GuildId>("\"not-a-number\"").is_err());
    }
}
