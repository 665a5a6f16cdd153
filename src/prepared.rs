//! Prepared-statement cache.
//!
//! Keyed by CQL text, backed by `lru::LruCache`. Concurrent `prepare()`
//! calls for the same text share one in-flight PREPARE request via a
//! `Notify`: the first caller becomes the "lead" and does the roundtrip,
//! everyone else waits on the same cache slot to resolve.
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Notify;

use crate::protocol::response::ColumnSpec;

#[derive(Debug, Clone)]
pub struct PreparedStatement {
    pub id: Bytes,
    pub bind_metadata: Arc<Vec<ColumnSpec>>,
    pub result_metadata: Arc<Vec<ColumnSpec>>,
}

enum Slot {
    Preparing(Arc<Notify>),
    Ready(PreparedStatement),
}

pub(crate) enum PollResult {
    /// Already prepared; use it directly.
    Ready(PreparedStatement),
    /// Someone else is preparing this text; await the `Notify`, then poll
    /// again.
    InFlight(Arc<Notify>),
    /// This caller is first; it owns sending PREPARE and must call
    /// [`PreparedCache::complete`] or [`PreparedCache::abandon`].
    Lead(Arc<Notify>),
}

pub(crate) struct PreparedCache {
    inner: Mutex<LruCache<String, Slot>>,
}

impl PreparedCache {
    pub(crate) fn new(capacity: NonZeroUsize) -> PreparedCache {
        PreparedCache { inner: Mutex::new(LruCache::new(capacity)) }
    }

    pub(crate) fn poll(&self, cql: &str) -> PollResult {
        let mut cache = self.inner.lock().expect("prepared cache lock poisoned");
        match cache.get(cql) {
            Some(Slot::Ready(stmt)) => PollResult::Ready(stmt.clone()),
            Some(Slot::Preparing(notify)) => PollResult::InFlight(notify.clone()),
            None => {
                let notify = Arc::new(Notify::new());
                cache.put(cql.to_string(), Slot::Preparing(notify.clone()));
                PollResult::Lead(notify)
            }
        }
    }

    /// The lead caller's PREPARE succeeded; publish the result and wake
    /// every waiter.
    pub(crate) fn complete(&self, cql: &str, stmt: PreparedStatement) {
        let notify = {
            let mut cache = self.inner.lock().expect("prepared cache lock poisoned");
            let notify = match cache.peek(cql) {
                Some(Slot::Preparing(notify)) => Some(notify.clone()),
                _ => None,
            };
            cache.put(cql.to_string(), Slot::Ready(stmt));
            notify
        };
        if let Some(notify) = notify {
            notify.notify_waiters();
        }
    }

    /// The lead caller's PREPARE failed; clear the slot so the next caller
    /// retries instead of waiting on a `Notify` that will never fire again.
    pub(crate) fn abandon(&self, cql: &str) {
        let notify = {
            let mut cache = self.inner.lock().expect("prepared cache lock poisoned");
            match cache.pop(cql) {
                Some(Slot::Preparing(notify)) => Some(notify),
                _ => None,
            }
        };
        if let Some(notify) = notify {
            notify.notify_waiters();
        }
    }

    /// Drops any cached statement whose bind or result metadata references
    /// `keyspace` (and `table`, if given), after a `SCHEMA_CHANGE` event
    ///. Conservative: a statement touching the keyspace at
    /// all is invalidated even if only one of several referenced tables
    /// changed.
    pub(crate) fn invalidate_schema(&self, keyspace: &str, table: Option<&str>) {
        let mut cache = self.inner.lock().expect("prepared cache lock poisoned");
        let stale: Vec<String> = cache
            .iter()
            .filter_map(|(cql, slot)| match slot {
                Slot::Ready(stmt) => {
                    let hits = stmt
                        .bind_metadata
                        .iter()
                        .chain(stmt.result_metadata.iter())
                        .any(|c| c.keyspace == keyspace && table.is_none_or(|t| c.table == t));
                    hits.then(|| cql.clone())
                }
                _ => None,
            })
            .collect();
        for cql in stale {
            cache.pop(&cql);
        }
    }

    /// Drops any cached statement carrying `id`, after the server reports
    /// `UNPREPARED` for it.
    pub(crate) fn invalidate_id(&self, id: &[u8]) {
        let mut cache = self.inner.lock().expect("prepared cache lock poisoned");
        let stale: Vec<String> = cache
            .iter()
            .filter_map(|(cql, slot)| match slot {
                Slot::Ready(stmt) if stmt.id.as_ref() == id => Some(cql.clone()),
                _ => None,
            })
            .collect();
        for cql in stale {
            cache.pop(&cql);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_statement() -> PreparedStatement {
        PreparedStatement {
            id: Bytes::from_static(b"id-1"),
            bind_metadata: Arc::new(Vec::new()),
            result_metadata: Arc::new(Vec::new()),
        }
    }

    fn statement_on(keyspace: &str, table: &str) -> PreparedStatement {
        use crate::protocol::response::ColumnSpec;
        PreparedStatement {
            id: Bytes::from_static(b"id-2"),
            bind_metadata: Arc::new(Vec::new()),
            result_metadata: Arc::new(vec![ColumnSpec {
                keyspace: keyspace.to_string(),
                table: table.to_string(),
                name: "a".to_string(),
                type_id: crate::protocol::types::CqlType::ID_INT,
            }]),
        }
    }

    #[test]
    fn invalidate_schema_evicts_statements_on_changed_table() {
        let cache = PreparedCache::new(NonZeroUsize::new(8).unwrap());
        let _ = cache.poll("select a from ks.t");
        cache.complete("select a from ks.t", statement_on("ks", "t"));
        cache.invalidate_schema("ks", Some("t"));
        assert!(matches!(cache.poll("select a from ks.t"), PollResult::Lead(_)));
    }

    #[test]
    fn invalidate_schema_spares_other_keyspaces() {
        let cache = PreparedCache::new(NonZeroUsize::new(8).unwrap());
        let _ = cache.poll("select a from ks.t");
        cache.complete("select a from ks.t", statement_on("ks", "t"));
        cache.invalidate_schema("other_ks", None);
        assert!(matches!(cache.poll("select a from ks.t"), PollResult::Ready(_)));
    }

    #[test]
    fn first_caller_leads_second_waits() {
        let cache = PreparedCache::new(NonZeroUsize::new(8).unwrap());
        assert!(matches!(cache.poll("select 1"), PollResult::Lead(_)));
        assert!(matches!(cache.poll("select 1"), PollResult::InFlight(_)));
    }

    #[test]
    fn completed_prepare_is_ready_for_everyone() {
        let cache = PreparedCache::new(NonZeroUsize::new(8).unwrap());
        let _ = cache.poll("select 1");
        cache.complete("select 1", dummy_statement());
        assert!(matches!(cache.poll("select 1"), PollResult::Ready(_)));
    }

    #[test]
    fn abandoned_prepare_lets_next_caller_lead() {
        let cache = PreparedCache::new(NonZeroUsize::new(8).unwrap());
        let _ = cache.poll("select 1");
        cache.abandon("select 1");
        assert!(matches!(cache.poll("select 1"), PollResult::Lead(_)));
    }

    #[test]
    fn invalidate_by_id_evicts_matching_entry() {
        let cache = PreparedCache::new(NonZeroUsize::new(8).unwrap());
        let _ = cache.poll("select 1");
        cache.complete("select 1", dummy_statement());
        cache.invalidate_id(b"id-1");
        assert!(matches!(cache.poll("select 1"), PollResult::Lead(_)));
    }
}
