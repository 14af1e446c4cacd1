//! Domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! types in `ispeco_api::models`.

pub mod access;
pub mod auth;
pub mod camera;
pub mod setup;

use std::fmt;

/// A value that is not a member of an enumerated choice set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidChoice {
    pub value: String,
    pub allowed: &'static [&'static str],
}

impl fmt::Display for InvalidChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" is not a valid choice (expected one of: {})",
            self.value,
            self.allowed.join(", ")
        )
    }
}

impl std::error::Error for InvalidChoice {}

/// Declares a closed set of string choices backed by a PostgreSQL enum type.
///
/// Generates the enum with matching serde and sqlx renames, `as_str`,
/// `Display` and a `FromStr` that reports the allowed values.
macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident in $pg_type:literal {
            $($variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize, sqlx::Type,
        )]
        #[sqlx(type_name = $pg_type)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                #[sqlx(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// Every accepted value, in declaration order.
            pub const CHOICES: &'static [&'static str] = &[$($value),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::InvalidChoice;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($value => Ok($name::$variant),)+
                    other => Err($crate::models::InvalidChoice {
                        value: other.to_string(),
                        allowed: Self::CHOICES,
                    }),
                }
            }
        }
    };
}

pub(crate) use choice_enum;
