//! Strongly-typed identifiers for synced entities
//!
//! Plugin-side records (orders, form entries, users, products) are keyed by
//! numeric post/user IDs, while CRM-side records (contacts, tags) are keyed by
//! whatever opaque string the CRM hands back. Newtype wrappers keep the two
//! families from being mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! define_numeric_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates an identifier from the raw numeric ID
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the raw numeric ID
            pub const fn get(&self) -> u64 {
                self.0
            }

            /// Returns the identifier prefix used in log context
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Accept "#501" and "ORD-501" as well as "501"
                let raw = s.trim();
                let raw = raw.strip_prefix(concat!($prefix, "-")).unwrap_or(raw);
                let raw = raw.strip_prefix('#').unwrap_or(raw);
                Ok(Self(raw.parse()?))
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

macro_rules! define_string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from the CRM's raw value
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the raw value
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the trimmed value is non-empty
            pub fn is_valid(&self) -> bool {
                !self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Plugin-side identifiers
define_numeric_id!(EntityId, "ENT");
define_numeric_id!(AccountId, "USR");
define_numeric_id!(ItemId, "PRD");
define_numeric_id!(FormId, "FRM");
define_numeric_id!(FeedId, "FEED");

// CRM-side identifiers
define_string_id!(ContactId);
define_string_id!(TagId);
