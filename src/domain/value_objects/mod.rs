//! Value objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Email address identifying a user, a cart and a wishlist entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserEmail(String);

impl UserEmail {
    pub fn parse(value: impl Into<String>) -> Result<Self, EmailError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(EmailError::Empty); }
        if !validator::validate_email(value.as_str()) { return Err(EmailError::Invalid(value)); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for UserEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for UserEmail {
    type Error = EmailError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::parse(value) }
}

impl From<UserEmail> for String {
    fn from(email: UserEmail) -> Self { email.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmailError {
    #[error("email is required")]
    Empty,
    #[error("invalid email address: {0}")]
    Invalid(String),
}

/// Sums an iterator of amounts, starting from zero. `None` on overflow.
pub fn sum_amounts<'a>(amounts: impl IntoIterator<Item = &'a Decimal>) -> Option<Decimal> {
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(*amount))
}

/// Unit price times quantity. `None` on overflow.
pub fn line_amount(unit_price: Decimal, quantity: u32) -> Option<Decimal> { unit_price.checked_mul(Decimal::from(quantity)) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_trimmed() {
        let email = UserEmail::parse("  a@x.com ").unwrap();
        assert_eq!(email.as_str(), "a@x.com");
    }

    #[test]
    fn test_email_rejects_garbage() {
        assert_eq!(UserEmail::parse(""), Err(EmailError::Empty));
        assert!(matches!(UserEmail::parse("not-an-email"), Err(EmailError::Invalid(_))));
    }

    #[test]
    fn test_email_deserialize() {
        let email: UserEmail = serde_json::from_str("\"b@y.org\"").unwrap();
        assert_eq!(email.to_string(), "b@y.org");
        assert!(serde_json::from_str::<UserEmail>("\"nope\"").is_err());
    }

    #[test]
    fn test_amounts() {
        let prices = [Decimal::new(10, 0), Decimal::new(55, 1)];
        assert_eq!(sum_amounts(&prices), Some(Decimal::new(155, 1)));
        assert_eq!(line_amount(Decimal::new(250, 2), 3), Some(Decimal::new(750, 2)));
    }

    #[test]
    fn test_amounts_overflow() {
        assert_eq!(sum_amounts(&[Decimal::MAX, Decimal::ONE]), None);
        assert_eq!(line_amount(Decimal::MAX, 2), None);
    }
}
