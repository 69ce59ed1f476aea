//! Verified subject identifiers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`SubjectId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SubjectIdError {
    /// The input string is empty or only whitespace.
    #[error("subject id cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("subject id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// The stable unique identifier a verified credential resolves to.
///
/// For Firebase Authentication this is the user's `uid` (the `sub` claim of an
/// ID token). It keys both the administrators allow-list and audit entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Firebase caps `uid` at 128 characters.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a `SubjectId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is blank or longer than 128 characters.
    pub fn parse(s: &str) -> Result<Self, SubjectIdError> {
        if s.trim().is_empty() {
            return Err(SubjectIdError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SubjectIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `SubjectId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SubjectId {
    type Err = SubjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for SubjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for SubjectId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for SubjectId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for SubjectId {
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
    fn test_parse_firebase_uid() {
        let id = SubjectId::parse("uid_7").unwrap();
        assert_eq!(id.as_str(), "uid_7");
    }

    #[test]
    fn test_parse_blank_is_rejected() {
        assert_eq!(SubjectId::parse(""), Err(SubjectIdError::Empty));
        assert_eq!(SubjectId::parse("   "), Err(SubjectIdError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "u".repeat(129);
        assert!(matches!(
            SubjectId::parse(&long),
            Err(SubjectIdError::TooLong { max: 128 })
        ));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = SubjectId::parse("uid_9").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"uid_9\"");
    }
}
