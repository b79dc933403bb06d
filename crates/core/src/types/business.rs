//! Business type configured once at setup.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`BusinessType`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BusinessTypeError {
    /// The input is empty or whitespace.
    #[error("business type cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("business type must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// The category of store the POS is set up for (`retail`, `restaurant`, ...).
///
/// Until one is saved the dashboard only offers the setup flow.
///
/// ## Constraints
///
/// - Surrounding whitespace is trimmed
/// - Length after trimming: 1-64 characters
///
/// ## Examples
///
/// ```
/// use tillpoint_core::BusinessType;
///
/// assert_eq!(BusinessType::parse("  retail ").unwrap().as_str(), "retail");
/// assert!(BusinessType::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct BusinessType(String);

impl BusinessType {
    /// Maximum length of a business type.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `BusinessType` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty or longer than 64 characters.
    pub fn parse(s: &str) -> Result<Self, BusinessTypeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(BusinessTypeError::Empty);
        }
        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(BusinessTypeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the business type as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BusinessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for BusinessType {
    type Err = BusinessTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BusinessType {
    type Error = BusinessTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BusinessType> for String {
    fn from(value: BusinessType) -> Self {
        value.0
    }
}

/// Business-type setting as served by `/api/settings/business-type`.
///
/// `business_type` is `null` until setup has been completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BusinessTypeSetting {
    pub business_type: Option<BusinessType>,
}
