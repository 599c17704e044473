//! Sync-token bookkeeping for read-your-writes consistency.
//!
//! App Configuration replicas return `Sync-Token` response headers of the
//! form `<id>=<value>;sn=<sequence>`. Echoing the `<id>=<value>` part on
//! later requests guarantees the service observes the client's own writes
//! even when requests land on different replicas.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone)]
struct SyncToken {
    /// The `<id>=<value>` fragment echoed back to the service.
    token: String,
    sequence: i64,
}

/// Shared store of sync tokens, cloned along with the client.
///
/// Clones share the same underlying map, so a write observed through one
/// clone is echoed by all of them.
#[derive(Debug, Clone, Default)]
pub struct SyncTokenStore {
    tokens: Arc<Mutex<HashMap<String, SyncToken>>>,
}

impl SyncTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the tokens carried by a `Sync-Token` response header.
    ///
    /// The header may carry several comma-separated tokens. A token replaces
    /// a stored one with the same id only when its sequence number is newer.
    /// Malformed fragments are skipped.
    pub fn update(&self, header_value: &str) {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        for fragment in header_value.split(',') {
            let Some((id, token)) = parse_fragment(fragment.trim()) else {
                continue;
            };
            match tokens.get(&id) {
                Some(existing) if existing.sequence >= token.sequence => {}
                _ => {
                    tokens.insert(id, token);
                }
            }
        }
    }

    /// Add an externally obtained sync token, e.g. one handed over by an
    /// Event Grid notification. Same merge semantics as [`update`](Self::update).
    pub fn add(&self, token: &str) {
        self.update(token);
    }

    /// Render the `Sync-Token` request header value, or `None` when no
    /// tokens have been recorded yet.
    ///
    /// Tokens are rendered in id order so the header is deterministic.
    pub fn header_value(&self) -> Option<String> {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        if tokens.is_empty() {
            return None;
        }
        let mut entries: Vec<(&String, &SyncToken)> = tokens.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Some(
            entries
                .into_iter()
                .map(|(_, t)| t.token.as_str())
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

/// Parse one `<id>=<value>;sn=<sequence>` fragment. A missing `sn` part is
/// treated as sequence 0 so externally supplied bare tokens are accepted.
fn parse_fragment(fragment: &str) -> Option<(String, SyncToken)> {
    let (token_part, sn_part) = match fragment.split_once(';') {
        Some((token, rest)) => (token, Some(rest)),
        None => (fragment, None),
    };
    let (id, value) = token_part.split_once('=')?;
    if id.is_empty() || value.is_empty() {
        return None;
    }
    let sequence = match sn_part {
        Some(rest) => rest.strip_prefix("sn=")?.parse().ok()?,
        None => 0,
    };
    Some((
        id.to_string(),
        SyncToken {
            token: token_part.to_string(),
            sequence,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_has_no_header() {
        let store = SyncTokenStore::new();
        assert_eq!(store.header_value(), None);
    }

    #[test]
    fn records_single_token() {
        let store = SyncTokenStore::new();
        store.update("jtqGc1I4=MDoyOA==;sn=28");
        assert_eq!(store.header_value(), Some("jtqGc1I4=MDoyOA==".to_string()));
    }

    #[test]
    fn newer_sequence_replaces_older() {
        let store = SyncTokenStore::new();
        store.update("jtqGc1I4=MDoyOA==;sn=28");
        store.update("jtqGc1I4=MDozMA==;sn=30");
        assert_eq!(store.header_value(), Some("jtqGc1I4=MDozMA==".to_string()));
    }

    #[test]
    fn older_sequence_is_ignored() {
        let store = SyncTokenStore::new();
        store.update("jtqGc1I4=MDozMA==;sn=30");
        store.update("jtqGc1I4=MDoyOA==;sn=28");
        assert_eq!(store.header_value(), Some("jtqGc1I4=MDozMA==".to_string()));
    }

    #[test]
    fn multiple_ids_are_joined_in_id_order() {
        let store = SyncTokenStore::new();
        store.update("zzz=Zm9v;sn=1,aaa=YmFy;sn=2");
        assert_eq!(store.header_value(), Some("aaa=YmFy,zzz=Zm9v".to_string()));
    }

    #[test]
    fn malformed_fragments_are_skipped() {
        let store = SyncTokenStore::new();
        store.update("no-equals-sign");
        store.update("=missing-id;sn=1");
        store.update("id=;sn=1");
        store.update("id=val;sn=not-a-number");
        assert_eq!(store.header_value(), None);

        // A valid token among malformed ones is still recorded.
        store.update("garbage,ok=dmFsdWU=;sn=5");
        assert_eq!(store.header_value(), Some("ok=dmFsdWU=".to_string()));
    }

    #[test]
    fn bare_token_without_sequence_is_accepted() {
        let store = SyncTokenStore::new();
        store.add("jtqGc1I4=MDoyOA==");
        assert_eq!(store.header_value(), Some("jtqGc1I4=MDoyOA==".to_string()));

        // Any sequenced token with the same id wins over the bare one.
        store.update("jtqGc1I4=MDozMA==;sn=1");
        assert_eq!(store.header_value(), Some("jtqGc1I4=MDozMA==".to_string()));
    }

    #[test]
    fn clones_share_state() {
        let store = SyncTokenStore::new();
        let clone = store.clone();
        store.update("jtqGc1I4=MDoyOA==;sn=28");
        assert_eq!(clone.header_value(), Some("jtqGc1I4=MDoyOA==".to_string()));
    }
}
