//! The reply-to address on an order.

use core::fmt;

use serde::Serialize;

/// Why an order form's email field was refused. Messages complete the
/// sentence "Please enter a valid email: ...".
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("the field is blank")]
    Blank,
    #[error("it is longer than {max} characters")]
    TooLong { max: usize },
    #[error("it contains a space")]
    ContainsSpace,
    #[error("it needs exactly one @")]
    AtCount,
    #[error("something must come before the @")]
    NoMailbox,
    #[error("\"{0}\" is not a mail domain")]
    BadDomain(String),
}

/// A customer's email address, as typed into the order form.
///
/// The bakery answers every order by hand, so the check only catches typos a
/// person would make: blank fields, stray spaces, a missing or doubled `@`,
/// and domains like `gmail` or `gmail..com`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Longest address a mail server will route.
    pub const MAX_LENGTH: usize = 254;

    /// Validate the form's email field. Leading and trailing whitespace is
    /// dropped first.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, in the order listed on [`EmailError`].
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EmailError::Blank);
        }
        if input.chars().count() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if input.chars().any(char::is_whitespace) {
            return Err(EmailError::ContainsSpace);
        }

        let Some((mailbox, domain)) = input.split_once('@') else {
            return Err(EmailError::AtCount);
        };
        if domain.contains('@') {
            return Err(EmailError::AtCount);
        }
        if mailbox.is_empty() {
            return Err(EmailError::NoMailbox);
        }
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
            return Err(EmailError::BadDomain(domain.to_owned()));
        }

        Ok(Self(input.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_typical_customer_addresses() {
        for input in [
            "dana@example.com",
            "dana.miller+cookies@mail.example.co.uk",
            "  Dana@Example.com\n",
        ] {
            let email = Email::parse(input).unwrap();
            assert_eq!(email.as_str(), input.trim());
        }
    }

    #[test]
    fn test_blank_field() {
        assert_eq!(Email::parse(""), Err(EmailError::Blank));
        assert_eq!(Email::parse(" \t "), Err(EmailError::Blank));
    }

    #[test]
    fn test_common_typos() {
        assert_eq!(Email::parse("dana @example.com"), Err(EmailError::ContainsSpace));
        assert_eq!(Email::parse("dana.example.com"), Err(EmailError::AtCount));
        assert_eq!(Email::parse("dana@@example.com"), Err(EmailError::AtCount));
        assert_eq!(Email::parse("@example.com"), Err(EmailError::NoMailbox));
        assert_eq!(
            Email::parse("dana@gmail"),
            Err(EmailError::BadDomain("gmail".to_owned()))
        );
        assert_eq!(
            Email::parse("dana@gmail..com"),
            Err(EmailError::BadDomain("gmail..com".to_owned()))
        );
        assert_eq!(
            Email::parse("dana@"),
            Err(EmailError::BadDomain(String::new()))
        );
    }

    #[test]
    fn test_overlong_address() {
        let input = format!("{}@example.com", "d".repeat(250));
        assert_eq!(
            Email::parse(&input),
            Err(EmailError::TooLong { max: 254 })
        );
    }

    #[test]
    fn test_error_reads_as_form_message() {
        let err = Email::parse("dana@gmail").unwrap_err();
        assert_eq!(
            format!("Please enter a valid email: {err}."),
            "Please enter a valid email: \"gmail\" is not a mail domain."
        );
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let email = Email::parse("dana@example.com").unwrap();
        assert_eq!(email.to_string(), "dana@example.com");
        assert_eq!(serde_json::to_value(&email).unwrap(), "dana@example.com");
    }
}
