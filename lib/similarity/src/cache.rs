//! Per-table embedding cache
//!
//! Column-name and row embeddings are computed once per loaded table and
//! reused by every question against it. The cache key is the table identity,
//! so a reloaded table never sees the embeddings of its predecessor.

use crate::embedder::{check_dimensions, EmbeddingProvider};
use ahash::AHashMap;
use csvsense_core::{Result, Table, TableId, Vector};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Embeddings derived from one table
#[derive(Debug, Clone)]
pub struct TableEmbeddings {
    pub table_id: TableId,
    pub model_id: String,
    /// One vector per column name, in column order
    pub columns: Vec<Vector>,
    /// One vector per RowText, in row order
    pub rows: Vec<Vector>,
}

impl TableEmbeddings {
    pub fn compute(table: &Table, provider: &dyn EmbeddingProvider) -> Result<Self> {
        let started = Instant::now();

        let columns = provider.encode(&table.column_names())?;
        check_dimensions(provider.dimension(), &columns)?;

        let rows = provider.encode(table.row_texts())?;
        check_dimensions(provider.dimension(), &rows)?;

        info!(
            table = %table.id(),
            model = provider.model_id(),
            columns = columns.len(),
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Computed table embeddings"
        );

        Ok(Self {
            table_id: table.id(),
            model_id: provider.model_id().to_string(),
            columns,
            rows,
        })
    }
}

type Slot = Arc<OnceCell<Arc<TableEmbeddings>>>;

/// Shared cache of [`TableEmbeddings`] keyed by [`TableId`].
///
/// Concurrent first requests for the same table wait on a single
/// computation. A failed computation leaves the slot empty.
#[derive(Default)]
pub struct EmbeddingCache {
    slots: RwLock<AHashMap<TableId, Slot>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: TableId) -> Slot {
        if let Some(slot) = self.slots.read().get(&id) {
            return slot.clone();
        }
        self.slots.write().entry(id).or_default().clone()
    }

    pub fn get_or_compute(
        &self,
        table: &Table,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Arc<TableEmbeddings>> {
        let slot = self.slot(table.id());
        slot.get_or_try_init(|| TableEmbeddings::compute(table, provider).map(Arc::new))
            .map(Arc::clone)
    }

    /// Embeddings for the table if they are already computed
    pub fn get(&self, id: TableId) -> Option<Arc<TableEmbeddings>> {
        self.slots.read().get(&id).and_then(|slot| slot.get().cloned())
    }

    pub fn is_ready(&self, id: TableId) -> bool {
        self.get(id).is_some()
    }

    /// Drop the entry for a table that was replaced or discarded
    pub fn invalidate(&self, id: TableId) -> bool {
        let removed = self.slots.write().remove(&id).is_some();
        if removed {
            debug!(table = %id, "Invalidated table embeddings");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;
    use csvsense_core::{Column, ColumnKind, Error};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        inner: HashingEmbedder,
        calls: AtomicUsize,
    }

    impl EmbeddingProvider for CountingProvider {
        fn model_id(&self) -> &str {
            self.inner.model_id()
        }
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
        fn encode(&self, texts: &[String]) -> Result<Vec<Vector>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.encode(texts)
        }
    }

    struct BrokenProvider;

    impl EmbeddingProvider for BrokenProvider {
        fn model_id(&self) -> &str {
            "broken"
        }
        fn dimension(&self) -> usize {
            8
        }
        fn encode(&self, texts: &[String]) -> Result<Vec<Vector>> {
            Ok(texts.iter().map(|_| Vector::new(vec![0.0; 4])).collect())
        }
    }

    fn table() -> Table {
        Table::new(vec![
            Column::new("nombre", ColumnKind::FreeText, vec![Some("pan".into()), Some("leche".into())]),
            Column::new("precio", ColumnKind::Numeric, vec![Some("1".into()), Some("2".into())]),
        ])
        .unwrap()
    }

    #[test]
    fn test_computed_once_per_table() {
        let provider = CountingProvider {
            inner: HashingEmbedder::new(32),
            calls: AtomicUsize::new(0),
        };
        let cache = EmbeddingCache::new();
        let t = table();

        let first = cache.get_or_compute(&t, &provider).unwrap();
        let second = cache.get_or_compute(&t, &provider).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        // one call for column names, one for rows
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(first.columns.len(), 2);
        assert_eq!(first.rows.len(), 2);
        assert!(cache.is_ready(t.id()));
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let provider = CountingProvider {
            inner: HashingEmbedder::new(32),
            calls: AtomicUsize::new(0),
        };
        let cache = EmbeddingCache::new();
        let t = table();

        cache.get_or_compute(&t, &provider).unwrap();
        assert!(cache.invalidate(t.id()));
        assert!(!cache.is_ready(t.id()));
        assert!(!cache.invalidate(t.id()));

        cache.get_or_compute(&t, &provider).unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_reloaded_table_gets_its_own_entry() {
        let provider = HashingEmbedder::new(32);
        let cache = EmbeddingCache::new();
        let (a, b) = (table(), table());

        cache.get_or_compute(&a, &provider).unwrap();
        assert!(!cache.is_ready(b.id()));
        cache.get_or_compute(&b, &provider).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_wrong_dimension_is_rejected_and_not_cached() {
        let cache = EmbeddingCache::new();
        let t = table();

        let err = cache.get_or_compute(&t, &BrokenProvider).unwrap_err();
        assert!(matches!(err, Error::InvalidDimension { expected: 8, actual: 4 }));
        assert!(!cache.is_ready(t.id()));
    }
}
