//! Invitation hashes.
//!
//! A hash is `ph_` followed by one hex character and at least one more
//! alphanumeric character, ten characters or more in total. Locally generated
//! hashes fold a timestamp and two random strings through a 31-multiplier
//! rolling hash. That is entropy, not cryptography: the server rejects
//! collisions on insert.

use std::fmt;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

pub const TOKEN_PREFIX: &str = "ph_";
pub const MIN_TOKEN_LEN: usize = 10;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SALT_LEN: usize = 11;

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvitationToken(String);

impl InvitationToken {
    pub fn parse(candidate: impl AsRef<str>) -> Result<Self, TokenError> {
        let candidate = candidate.as_ref();
        if validate(candidate) {
            Ok(Self(candidate.to_string()))
        } else {
            Err(TokenError::Malformed)
        }
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for InvitationToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvitationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for InvitationToken {
    type Error = TokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if validate(&value) {
            Ok(Self(value))
        } else {
            Err(TokenError::Malformed)
        }
    }
}

impl From<InvitationToken> for String {
    fn from(value: InvitationToken) -> Self {
        value.0
    }
}

/// Proposes a fresh hash. Never fails.
pub fn generate() -> InvitationToken {
    let mut rng = rand::thread_rng();
    let salt = random_base36(&mut rng, SALT_LEN);
    let pepper = random_base36(&mut rng, SALT_LEN);
    let seed = format!("{}{}{}", Utc::now().timestamp_millis(), salt, pepper);
    let folded = rolling_hash(&seed);
    InvitationToken(format!("{TOKEN_PREFIX}{:x}{salt}", folded.unsigned_abs()))
}

/// Pure syntactic check, no network involved.
pub fn validate(candidate: &str) -> bool {
    if candidate.len() < MIN_TOKEN_LEN {
        return false;
    }
    let Some(prefix) = candidate.get(..TOKEN_PREFIX.len()) else {
        return false;
    };
    if !prefix.eq_ignore_ascii_case(TOKEN_PREFIX) {
        return false;
    }
    let body = &candidate[TOKEN_PREFIX.len()..];
    let starts_hex = body.chars().next().is_some_and(|c| c.is_ascii_hexdigit());
    starts_hex && body.len() >= 2 && body.chars().all(|c| c.is_ascii_alphanumeric())
}

fn rolling_hash(input: &str) -> i32 {
    input
        .chars()
        .fold(0i32, |hash, c| hash.wrapping_mul(31).wrapping_add(c as i32))
}

fn random_base36(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_obviously_bad_candidates() {
        assert!(!validate(""));
        assert!(!validate("ph_"));
        assert!(!validate("abc_1234567890"));
        assert!(!validate("ph_abc12"));
        assert!(!validate("ph_zzzzzzzzzz"));
        assert!(!validate("ph_dead-beef99"));
        assert!(!validate("ph_déadbeef99"));
    }

    #[test]
    fn accepts_case_insensitively() {
        assert!(validate("ph_deadbeefxyz123"));
        assert!(validate("PH_DEADBEEFXYZ123"));
        assert!(validate("ph_a1234567"));
    }

    #[test]
    fn rolling_hash_wraps_to_i32() {
        assert_eq!(rolling_hash(""), 0);
        assert_eq!(rolling_hash("a"), 97);
        assert_eq!(rolling_hash("ab"), 97 * 31 + 98);
        // long inputs overflow and keep folding
        let long = "z".repeat(64);
        let _ = rolling_hash(&long);
    }

    #[test]
    fn parse_round_trips_through_serde() {
        let token = InvitationToken::parse("ph_deadbeefxyz123").unwrap();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"ph_deadbeefxyz123\"");
        assert!(serde_json::from_str::<InvitationToken>("\"ph_\"").is_err());
    }

    proptest! {
        #[test]
        fn generated_tokens_always_validate(_seed in any::<u8>()) {
            let token = generate();
            prop_assert!(validate(token.as_str()), "{}", token);
        }

        #[test]
        fn short_strings_never_validate(tail in "[a-f0-9]{0,6}") {
            let candidate = format!("ph_{tail}");
            prop_assert!(!validate(&candidate));
        }
    }
}
