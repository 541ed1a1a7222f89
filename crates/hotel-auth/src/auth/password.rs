//! Password complexity policy
//!
//! Every rule is checked independently and every failure is reported, so the
//! front desk can show the full list of problems in one pass.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::config::PasswordPolicyConfig;

/// Punctuation accepted by the special-character rule
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

/// A single failed complexity rule
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PasswordRule {
    /// Fewer characters than the configured minimum
    TooShort { min_length: usize },
    /// No uppercase letter
    MissingUppercase,
    /// No decimal digit
    MissingDigit,
    /// No character from [`SPECIAL_CHARACTERS`]
    MissingSpecial,
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordRule::TooShort { min_length } => {
                write!(f, "Password must be at least {} characters long", min_length)
            }
            PasswordRule::MissingUppercase => {
                write!(f, "Password must contain at least one uppercase letter")
            }
            PasswordRule::MissingDigit => write!(f, "Password must contain at least one digit"),
            PasswordRule::MissingSpecial => write!(
                f,
                "Password must contain at least one special character ({})",
                SPECIAL_CHARACTERS
            ),
        }
    }
}

/// Outcome of checking a candidate password
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordCheck {
    /// True iff every active rule passed
    pub ok: bool,
    /// Failed rules in check order: length, uppercase, digit, special
    pub reasons: Vec<PasswordRule>,
}

impl PasswordCheck {
    /// Human-readable reasons, one per failed rule
    pub fn messages(&self) -> Vec<String> {
        self.reasons.iter().map(|r| r.to_string()).collect()
    }

    /// Convert into a `PolicyViolation` error when any rule failed
    pub fn into_result(self) -> Result<(), AuthError> {
        if self.ok {
            Ok(())
        } else {
            Err(AuthError::PolicyViolation(self.reasons))
        }
    }
}

/// Validates candidate passwords against the configured rules
#[derive(Clone, Debug)]
pub struct PasswordPolicy {
    config: PasswordPolicyConfig,
}

impl PasswordPolicy {
    /// Create a policy from configuration
    pub fn new(config: PasswordPolicyConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &PasswordPolicyConfig {
        &self.config
    }

    /// Check `password` against every active rule
    pub fn validate(&self, password: &str) -> PasswordCheck {
        let mut reasons = Vec::new();

        // Length counts characters, not bytes
        if password.chars().count() < self.config.min_length {
            reasons.push(PasswordRule::TooShort {
                min_length: self.config.min_length,
            });
        }

        if self.config.require_upper && !password.chars().any(char::is_uppercase) {
            reasons.push(PasswordRule::MissingUppercase);
        }

        if self.config.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            reasons.push(PasswordRule::MissingDigit);
        }

        if self.config.require_special
            && !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c))
        {
            reasons.push(PasswordRule::MissingSpecial);
        }

        PasswordCheck {
            ok: reasons.is_empty(),
            reasons,
        }
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(PasswordPolicyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict_policy() -> PasswordPolicy {
        PasswordPolicy::new(PasswordPolicyConfig {
            min_length: 8,
            require_upper: true,
            require_digit: true,
            require_special: true,
        })
    }

    #[test]
    fn test_all_rules_reported() {
        let check = strict_policy().validate("abc");
        assert!(!check.ok);
        assert_eq!(
            check.reasons,
            vec![
                PasswordRule::TooShort { min_length: 8 },
                PasswordRule::MissingUppercase,
                PasswordRule::MissingDigit,
                PasswordRule::MissingSpecial,
            ]
        );
    }

    #[test]
    fn test_compliant_password() {
        let check = strict_policy().validate("Abcdef1!");
        assert!(check.ok);
        assert!(check.reasons.is_empty());
        assert!(check.into_result().is_ok());
    }

    #[test]
    fn test_disabled_rules_skipped() {
        let policy = PasswordPolicy::new(PasswordPolicyConfig {
            min_length: 4,
            require_upper: false,
            require_digit: false,
            require_special: false,
        });
        assert!(policy.validate("abcd").ok);
        assert_eq!(
            policy.validate("abc").reasons,
            vec![PasswordRule::TooShort { min_length: 4 }]
        );
    }

    #[test]
    fn test_unicode_uppercase_and_length() {
        let policy = strict_policy();
        // Cyrillic capital letter counts as uppercase; 8 characters, more bytes
        let check = policy.validate("Пароль1!");
        assert!(check.ok, "{:?}", check.reasons);
    }

    #[test]
    fn test_each_special_character_accepted() {
        let policy = strict_policy();
        for c in SPECIAL_CHARACTERS.chars() {
            let candidate = format!("Abcdefg1{}", c);
            assert!(policy.validate(&candidate).ok, "rejected {:?}", c);
        }
    }

    #[test]
    fn test_unlisted_punctuation_not_special() {
        let check = strict_policy().validate("Abcdefg1-");
        assert_eq!(check.reasons, vec![PasswordRule::MissingSpecial]);
    }

    #[test]
    fn test_into_result_carries_reasons() {
        let err = strict_policy().validate("abcdefgh").into_result().unwrap_err();
        match err {
            AuthError::PolicyViolation(rules) => assert_eq!(rules.len(), 3),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_messages_in_rule_order() {
        let messages = strict_policy().validate("ABCDEFGH").messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("digit"));
        assert!(messages[1].contains("special"));
    }
}
