//! Contact name type.
//!
//! The name is half of the `(owner, name)` uniqueness key, so every path into
//! storage goes through [`ContactName::parse`] and stores the same normalised
//! form.

use core::fmt;

use serde::Serialize;

/// Errors that can occur when parsing a [`ContactName`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactNameError {
    /// The input is empty or whitespace only.
    #[error("contact name cannot be empty")]
    Empty,
    /// The input is too long after trimming.
    #[error("contact name must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length in characters.
        max: usize,
    },
    /// The input contains a control character.
    #[error("contact name cannot contain control characters")]
    ControlCharacter,
}

/// The display name of a contact, unique per owner.
///
/// ## Constraints
///
/// - Surrounding whitespace is trimmed
/// - Length: 1-100 characters
/// - No control characters (newlines, tabs, ...)
///
/// Comparison is exact on the trimmed value: `"Bob"` and `" Bob "` collide,
/// `"Bob"` and `"bob"` do not.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ContactName(String);

impl ContactName {
    /// Maximum length of a contact name, in characters.
    pub const MAX_LENGTH: usize = 100;

    /// Parse a `ContactName` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`Self::MAX_LENGTH`] characters, or contains control characters.
    pub fn parse(s: &str) -> Result<Self, ContactNameError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ContactNameError::Empty);
        }

        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(ContactNameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if trimmed.chars().any(char::is_control) {
            return Err(ContactNameError::ControlCharacter);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ContactName` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ContactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ContactName {
    type Err = ContactNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ContactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ContactName {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ContactName {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_names_collide() {
        assert_eq!(
            ContactName::parse("Bob").unwrap(),
            ContactName::parse("  Bob ").unwrap()
        );
    }

    #[test]
    fn test_case_sensitive() {
        assert_ne!(
            ContactName::parse("Bob").unwrap(),
            ContactName::parse("bob").unwrap()
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(ContactName::parse(""), Err(ContactNameError::Empty));
        assert_eq!(ContactName::parse("   "), Err(ContactNameError::Empty));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        assert!(ContactName::parse(&"é".repeat(100)).is_ok());
        assert!(matches!(
            ContactName::parse(&"é".repeat(101)),
            Err(ContactNameError::TooLong { max: 100 })
        ));
    }

    #[test]
    fn test_parse_control_character() {
        assert_eq!(
            ContactName::parse("Bob\nSmith"),
            Err(ContactNameError::ControlCharacter)
        );
    }
}
