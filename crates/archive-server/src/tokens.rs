//! Auth token table.
//!
//! Process-wide map from opaque 128-bit hex token to connection id. Tokens
//! are issued on SYSTEM.CONNECT, consumed by a successful SYSTEM.AUTH, and
//! purged when the connection goes away.

use std::collections::HashMap;

use archive_core::Environment;

/// Generate a fresh opaque token: 16 cryptographically random bytes, hex.
#[must_use]
pub fn generate_token(env: &impl Environment) -> String {
    let mut raw = [0u8; 16];
    env.random_bytes(&mut raw);
    hex::encode(raw)
}

/// Outstanding auth tokens.
#[derive(Debug, Default)]
pub struct TokenTable {
    tokens: HashMap<String, u32>,
}

impl TokenTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a token issued to `conn_id`.
    pub fn issue(&mut self, token: String, conn_id: u32) {
        self.tokens.insert(token, conn_id);
    }

    /// Consume `token` if it was issued to `conn_id`.
    ///
    /// A successful consume removes the entry - a token authenticates once.
    /// A mismatched or unknown token leaves the table untouched.
    pub fn consume(&mut self, token: &str, conn_id: u32) -> bool {
        if self.tokens.get(token) == Some(&conn_id) {
            self.tokens.remove(token);
            true
        } else {
            false
        }
    }

    /// Drop every token issued to `conn_id`.
    pub fn purge(&mut self, conn_id: u32) {
        self.tokens.retain(|_, owner| *owner != conn_id);
    }

    /// Number of outstanding tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True if no tokens are outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_requires_matching_connection() {
        let mut table = TokenTable::new();
        table.issue("abc123".to_string(), 1);

        // Wrong connection cannot consume someone else's token
        assert!(!table.consume("abc123", 2));
        assert_eq!(table.len(), 1);

        assert!(table.consume("abc123", 1));
        assert!(table.is_empty());

        // Tokens authenticate once
        assert!(!table.consume("abc123", 1));
    }

    #[test]
    fn unknown_token_is_rejected() {
        let mut table = TokenTable::new();
        assert!(!table.consume("nope", 1));
    }

    #[test]
    fn purge_removes_all_tokens_for_connection() {
        let mut table = TokenTable::new();
        table.issue("t1".to_string(), 1);
        table.issue("t2".to_string(), 1);
        table.issue("t3".to_string(), 2);

        table.purge(1);
        assert_eq!(table.len(), 1);
        assert!(table.consume("t3", 2));
    }
}
