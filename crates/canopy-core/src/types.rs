//! Strong identifier types for Canopy.
//!
//! All identifiers are 16-byte newtypes rendered in hyphenated UUID text form
//! (`8-4-4-4-12` lowercase hex). Keeping them distinct types prevents passing
//! a principal id where an item id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; 16]);

        impl $name {
            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes.
            pub const fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }

            /// Generate a fresh random id.
            pub fn random() -> Self {
                Self(Uuid::new_v4().into_bytes())
            }

            /// Parse from UUID text.
            pub fn parse(s: &str) -> Result<Self, ValidationError> {
                Uuid::parse_str(s)
                    .map(|uuid| Self(uuid.into_bytes()))
                    .map_err(|_| ValidationError::MalformedId(s.to_string()))
            }

            /// The id as a [`Uuid`].
            pub fn uuid(&self) -> Uuid {
                Uuid::from_bytes(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.uuid().hyphenated())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let text = self.uuid().simple().to_string();
                write!(f, "{}({})", stringify!($name), &text[..8])
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid.into_bytes())
            }
        }

        impl From<[u8; 16]> for $name {
            fn from(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }
        }
    };
}

uuid_newtype!(
    /// Identifier of a folder or resource.
    ItemId
);

uuid_newtype!(
    /// Identifier of a user or group.
    PrincipalId
);

uuid_newtype!(
    /// Identifier of a stored permission row.
    PermissionId
);
