// src/common/id_generator.rs
//! Crockford Base32 random identifiers
//!
//! Used for browser session ids and OAuth anti-forgery nonces. Catalog rows
//! use integer primary keys assigned by SQLite.

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Length of a browser session id (160 bits)
pub const SESSION_ID_LENGTH: usize = 32;

/// Length of an OAuth state nonce
pub const STATE_TOKEN_LENGTH: usize = 32;

/// Generate a random Crockford Base32 string of specified length
fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a browser session id
pub fn generate_session_id() -> String {
    generate_crockford_string(SESSION_ID_LENGTH)
}

/// Generate the anti-forgery nonce rendered into the login page
pub fn generate_state_token() -> String {
    generate_crockford_string(STATE_TOKEN_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_session_id_uses_crockford_alphabet() {
        let id = generate_session_id();
        assert_eq!(id.len(), SESSION_ID_LENGTH);
        assert!(id.bytes().all(|b| CROCKFORD_ALPHABET.contains(&b)));
        assert!(!id.contains('I') && !id.contains('L') && !id.contains('O') && !id.contains('U'));
    }

    #[test]
    fn test_session_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_session_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_state_token_length() {
        assert_eq!(generate_state_token().len(), STATE_TOKEN_LENGTH);
    }
}
