//! Verification codes, channel ids and usernames

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

/// A one-time verification code, issued out-of-band.
///
/// Codes are opaque to this system. The only checks are a length limit
/// of 64 characters and the absence of whitespace. Surrounding whitespace
/// is trimmed when parsing, since codes are usually pasted by hand.
#[derive(Clone, ToSchema, Serialize, Deserialize, Validate, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct VerificationCode {
    #[validate(length(min = 1, max = 64))]
    #[validate(custom = "no_whitespace")]
    inner: String,
}

// Codes are credentials, keep them out of logs
impl std::fmt::Debug for VerificationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("VerificationCode").field(&"<redacted>").finish()
    }
}

impl FromStr for VerificationCode {
    type Err = ValidationErrors;

    fn from_str(s: &str) -> Result<Self, ValidationErrors> {
        let code = Self {
            inner: s.trim().to_string(),
        };
        code.validate()?;
        Ok(code)
    }
}

impl AsRef<str> for VerificationCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl VerificationCode {
    /// Get a string reference of this code
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }
}

/// Identifier of the messaging channel a redemption request came from.
#[derive(Clone, Debug, ToSchema, Serialize, Deserialize, Validate, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct ChannelId {
    #[validate(length(min = 1, max = 64))]
    inner: String,
}

impl FromStr for ChannelId {
    type Err = ValidationErrors;

    fn from_str(s: &str) -> Result<Self, ValidationErrors> {
        let channel_id = Self {
            inner: s.to_string(),
        };
        channel_id.validate()?;
        Ok(channel_id)
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl AsRef<str> for ChannelId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl ChannelId {
    /// Get a string reference of this channel id
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }
}

/// The username of an identity in the identity user pool.
#[derive(Clone, ToSchema, Serialize, Deserialize, Validate, Eq, PartialEq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Username {
    #[validate(length(min = 1, max = 128))]
    inner: String,
}

impl std::fmt::Debug for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Username").field(&self.inner).finish()
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl FromStr for Username {
    type Err = ValidationErrors;

    fn from_str(s: &str) -> Result<Self, ValidationErrors> {
        let username = Self {
            inner: s.to_string(),
        };
        username.validate()?;
        Ok(username)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Username {
    /// Get a string reference of this username
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }
}

fn no_whitespace(s: &str) -> Result<(), ValidationError> {
    if s.chars().any(char::is_whitespace) {
        Err(ValidationError::new("whitespace is not allowed"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_code_is_trimmed() {
        let code: VerificationCode = "  ABC123\n".parse().unwrap();
        assert_eq!(code.as_str(), "ABC123");
    }

    #[test]
    fn test_code_invalid() {
        assert_matches!("".parse::<VerificationCode>(), Err(_));
        assert_matches!("   ".parse::<VerificationCode>(), Err(_));
        assert_matches!("ABC 123".parse::<VerificationCode>(), Err(_));
        assert_matches!("x".repeat(65).parse::<VerificationCode>(), Err(_));
    }

    #[test]
    fn test_code_length_limit() {
        assert_matches!("x".repeat(64).parse::<VerificationCode>(), Ok(_));
    }

    #[test]
    fn test_code_debug_is_redacted() {
        let code: VerificationCode = "ABC123".parse().unwrap();
        assert!(!format!("{code:?}").contains("ABC123"));
    }

    #[test]
    fn test_channel_id() {
        assert_matches!("chan-42".parse::<ChannelId>(), Ok(_));
        assert_matches!("1098745638213".parse::<ChannelId>(), Ok(_));
        assert_matches!("".parse::<ChannelId>(), Err(_));
    }

    #[test]
    fn test_username() {
        assert_matches!("alice".parse::<Username>(), Ok(_));
        assert_matches!("".parse::<Username>(), Err(_));
        assert_matches!("x".repeat(129).parse::<Username>(), Err(_));
    }
}
