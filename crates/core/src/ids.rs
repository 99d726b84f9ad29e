use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

/// Five hyphen-delimited groups of word characters, RFC 4122 shaped.
static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\w+-){4}\w+$").expect("id pattern is a valid regex"));

/// Returns true if `candidate` has the shape of an entity id.
pub fn is_valid_id(candidate: &str) -> bool {
    ID_PATTERN.is_match(candidate)
}

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Wraps a stored or caller-supplied id as-is.
            pub fn from_raw(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let short = self.0.get(..8).unwrap_or(&self.0);
                write!(f, "{}({})", stringify!($name), short)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(ArtistId);
string_id!(AlbumId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_generated_ids() {
        for _ in 0..32 {
            assert!(is_valid_id(ArtistId::new().as_str()));
            assert!(is_valid_id(AlbumId::new().as_str()));
        }
    }

    #[test]
    fn accepts_well_formed_uuid() {
        assert!(is_valid_id("123e4567-e89b-12d3-a456-426614174000"));
        assert!(is_valid_id("a-b-c-d-e"));
    }

    #[test]
    fn rejects_wrong_group_count() {
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("1234"));
        assert!(!is_valid_id("123e4567-e89b-12d3-a456"));
        assert!(!is_valid_id("a-b-c-d-e-f"));
        assert!(!is_valid_id("a--b-c-d"));
    }

    #[test]
    fn rejects_surrounding_noise() {
        assert!(!is_valid_id(" 123e4567-e89b-12d3-a456-426614174000"));
        assert!(!is_valid_id("123e4567-e89b-12d3-a456-426614174000/x"));
        assert!(!is_valid_id("a-b-c-d-e?id=1"));
    }

    #[test]
    fn from_raw_skips_validation() {
        let id = ArtistId::from_raw("whatever");
        assert_eq!(id.to_string(), "whatever");
        assert_eq!(format!("{id:?}"), "ArtistId(whatever)");
    }
}
