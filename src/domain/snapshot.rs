//! Refresh-replace snapshot store shared by every aggregator.
//!
//! A refresh either publishes a complete new [`Snapshot`] in one swap or
//! leaves the current one untouched and records the failure. Concurrent
//! refreshes are not serialized; the last one to finish wins.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use async_lock::RwLock;
use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;

use super::{AggregatedEntry, SourceTag};
use crate::error::{AggregatorError, SdkError};
use crate::shared::CanonicalAddress;

/// Immutable result of one successful refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<E, P> {
    pub entries: Vec<E>,
    pub positions: Vec<P>,
    /// `None` until the first successful refresh.
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Wallet the positions belong to. `None` when fetched without a session.
    pub owner: Option<CanonicalAddress>,
}

impl<E, P> Snapshot<E, P> {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            positions: Vec::new(),
            refreshed_at: None,
            owner: None,
        }
    }

    pub fn new(entries: Vec<E>, positions: Vec<P>, owner: Option<CanonicalAddress>) -> Self {
        Self {
            entries,
            positions,
            refreshed_at: Some(Utc::now()),
            owner,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.positions.is_empty()
    }
}

impl<S: SourceTag, P> Snapshot<AggregatedEntry<S>, P> {
    /// The entry listed under `id`.
    ///
    /// Fails with [`AggregatorError::AmbiguousEntry`] when more than one
    /// source lists the id; use [`entry_from`](Self::entry_from) then.
    pub fn entry(&self, id: &str) -> Result<&AggregatedEntry<S>, AggregatorError> {
        let mut matches = self.entries.iter().filter(|e| e.id == id);
        let first = matches
            .next()
            .ok_or_else(|| AggregatorError::EntryNotFound(id.to_string()))?;

        let mut sources = vec![first.source];
        for other in matches {
            if !sources.contains(&other.source) {
                sources.push(other.source);
            }
        }
        if sources.len() > 1 {
            return Err(AggregatorError::AmbiguousEntry {
                id: id.to_string(),
                sources: sources
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        Ok(first)
    }

    pub fn entry_from(&self, source: S, id: &str) -> Option<&AggregatedEntry<S>> {
        self.entries
            .iter()
            .find(|e| e.source == source && e.id == id)
    }

    pub fn entries_from(&self, source: S) -> impl Iterator<Item = &AggregatedEntry<S>> {
        self.entries.iter().filter(move |e| e.source == source)
    }
}

/// Holder of the current snapshot plus the error flag of the last refresh.
pub struct SnapshotStore<E, P> {
    current: RwLock<Arc<Snapshot<E, P>>>,
    last_error: RwLock<Option<String>>,
}

impl<E, P> Default for SnapshotStore<E, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, P> SnapshotStore<E, P> {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            last_error: RwLock::new(None),
        }
    }

    pub async fn current(&self) -> Arc<Snapshot<E, P>> {
        self.current.read().await.clone()
    }

    /// Message of the last failed refresh; cleared by the next success.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub async fn publish(&self, snapshot: Snapshot<E, P>) -> Arc<Snapshot<E, P>> {
        let snapshot = Arc::new(snapshot);
        *self.current.write().await = snapshot.clone();
        *self.last_error.write().await = None;
        snapshot
    }

    pub async fn record_failure(&self, err: &impl Display) {
        *self.last_error.write().await = Some(err.to_string());
    }

    /// Run `fetch` and publish its result, or record the failure and keep the
    /// current snapshot.
    pub async fn refresh_with<F>(
        &self,
        aggregator: &'static str,
        fetch: F,
    ) -> Result<Arc<Snapshot<E, P>>, SdkError>
    where
        F: Future<Output = Result<Snapshot<E, P>, SdkError>>,
    {
        match fetch.await {
            Ok(snapshot) => {
                tracing::debug!(
                    aggregator,
                    entries = snapshot.entries.len(),
                    positions = snapshot.positions.len(),
                    "refresh succeeded"
                );
                Ok(self.publish(snapshot).await)
            }
            Err(e) => {
                tracing::warn!(aggregator, error = %e, "refresh failed, keeping previous snapshot");
                self.record_failure(&e).await;
                Err(e)
            }
        }
    }
}

/// One concurrent batch: call `fetch` for every item and concatenate the
/// results in item order. Any failure fails the whole batch.
pub async fn fan_out<I, T, F, Fut>(items: I, fetch: F) -> Result<Vec<T>, AggregatorError>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<Vec<T>, AggregatorError>>,
{
    Ok(try_join_all(items.into_iter().map(fetch))
        .await?
        .into_iter()
        .flatten()
        .collect())
}
