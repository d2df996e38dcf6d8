use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use super::errors::CustomerError;

// ============================================================================
// Customer Value Objects
// ============================================================================

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// Customer email address
///
/// `parse` is used at the delivery boundary; `new` trusts its input and is
/// used when rehydrating rows that were validated on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    pub fn parse(raw: &str) -> Result<Self, CustomerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CustomerError::EmptyEmail);
        }
        if !EMAIL_PATTERN.is_match(trimmed) {
            return Err(CustomerError::InvalidEmail(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Customer display name, never blank
pub fn validate_name(raw: &str) -> Result<String, CustomerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CustomerError::EmptyName);
    }
    Ok(trimmed.to_string())
}
