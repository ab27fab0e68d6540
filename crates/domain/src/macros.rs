//! Macro for implementing Display and FromStr for mode enums
//!
//! Configuration values such as the scheduler failure policy or the upload
//! compression mode arrive as strings (environment variables, config files,
//! CLI flags). This macro gives them one consistent, case-insensitive
//! string form.
//!
//! # Example
//!
//! ```rust
//! use panelpost_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Visibility {
//!     Public,
//!     Unlisted,
//! }
//!
//! impl_domain_status_conversions!(Visibility {
//!     Public => "public",
//!     Unlisted => "unlisted",
//! });
//!
//! assert_eq!("PUBLIC".parse::<Visibility>().unwrap(), Visibility::Public);
//! ```

/// Implements Display and FromStr traits for mode enums
///
/// This macro generates:
/// - Display trait: converts enum variants to their canonical strings
/// - FromStr trait: parses case-insensitive strings to enum variants
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
