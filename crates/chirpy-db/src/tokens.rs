use chrono::{DateTime, Utc};

use chirpy_types::Result;

use crate::Database;

impl Database {
    /// Add a refresh token to the deny-list. Revoking twice keeps the first
    /// timestamp. Entries are never removed.
    pub fn revoke_refresh_token(&self, token: &str, revoked_at: DateTime<Utc>) -> Result<()> {
        self.with_doc_mut(|doc| {
            doc.revoked_refresh_tokens
                .entry(token.to_string())
                .or_insert(revoked_at);
            Ok(())
        })
    }

    pub fn is_refresh_token_revoked(&self, token: &str) -> Result<bool> {
        self.with_doc(|doc| Ok(doc.revoked_refresh_tokens.contains_key(token)))
    }

    pub fn refresh_token_revoked_at(&self, token: &str) -> Result<Option<DateTime<Utc>>> {
        self.with_doc(|doc| Ok(doc.revoked_refresh_tokens.get(token).copied()))
    }
}
