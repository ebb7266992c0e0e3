//! Session-keyed table state
//!
//! Every upload creates or replaces the table of one session. Embeddings for
//! the new table are computed in the background; the session's status is
//! observable as `loading`, `ready` or `failed` while that runs. Each upload
//! carries a generation number so a slow computation for a replaced table
//! can never overwrite the state of its successor.

use ahash::AHashMap;
use csvsense_core::{Error as CoreError, Table, TableId};
use csvsense_query::{AnswerView, EngineConfig, QaEngine};
use csvsense_schema::{TableLoader, TableSchema};
use csvsense_similarity::{EmbeddingCache, ModelLoader};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type SessionId = Uuid;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    /// The session's embeddings could not be computed
    #[error("Session unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Table(#[from] CoreError),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Loading,
    Ready,
    Failed,
}

struct Session {
    table: Arc<Table>,
    generation: u64,
    status: LoadStatus,
    error: Option<String>,
}

/// Public view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub status: LoadStatus,
    pub rows: usize,
    pub schema: TableSchema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A table accepted for a session, waiting for its embeddings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upload {
    pub session_id: SessionId,
    pub generation: u64,
}

pub struct SessionStore {
    sessions: RwLock<AHashMap<SessionId, Session>>,
    loader: TableLoader,
    models: Arc<ModelLoader>,
    cache: Arc<EmbeddingCache>,
    config: EngineConfig,
    engine: OnceCell<Arc<QaEngine>>,
    generations: AtomicU64,
}

impl SessionStore {
    pub fn new(models: Arc<ModelLoader>, config: EngineConfig) -> SessionResult<Self> {
        config.validate()?;
        Ok(Self {
            sessions: RwLock::new(AHashMap::new()),
            loader: TableLoader::new(config.inference),
            models,
            cache: Arc::new(EmbeddingCache::new()),
            config,
            engine: OnceCell::new(),
            generations: AtomicU64::new(0),
        })
    }

    /// The answering engine, built on first use from the shared model
    pub fn engine(&self) -> SessionResult<Arc<QaEngine>> {
        self.engine
            .get_or_try_init(|| {
                let provider = self.models.load()?;
                QaEngine::with_cache(provider, self.cache.clone(), self.config.clone()).map(Arc::new)
            })
            .map(Arc::clone)
            .map_err(SessionError::from)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Parse a CSV upload into a new session
    pub fn create(&self, csv: &[u8]) -> SessionResult<Upload> {
        let table = Arc::new(self.loader.load_bytes(csv)?);
        let session_id = Uuid::new_v4();
        let generation = self.next_generation();

        info!(
            session = %session_id,
            rows = table.row_count(),
            columns = table.column_count(),
            "Session created"
        );

        self.sessions.write().insert(
            session_id,
            Session {
                table,
                generation,
                status: LoadStatus::Loading,
                error: None,
            },
        );
        Ok(Upload { session_id, generation })
    }

    /// Replace the table of an existing session. A parse error leaves the
    /// previous table in place.
    pub fn replace(&self, session_id: SessionId, csv: &[u8]) -> SessionResult<Upload> {
        if !self.sessions.read().contains_key(&session_id) {
            return Err(SessionError::NotFound(session_id));
        }
        let table = Arc::new(self.loader.load_bytes(csv)?);
        let generation = self.next_generation();

        let previous = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .get_mut(&session_id)
                .ok_or(SessionError::NotFound(session_id))?;
            let previous = std::mem::replace(&mut session.table, table);
            session.generation = generation;
            session.status = LoadStatus::Loading;
            session.error = None;
            previous
        };

        self.cache.invalidate(previous.id());
        info!(session = %session_id, generation, "Session table replaced");
        Ok(Upload { session_id, generation })
    }

    /// Compute embeddings for an upload and record the outcome, unless a
    /// newer upload already replaced it. Blocking; run off the async executor.
    pub fn prepare(&self, upload: Upload) -> LoadStatus {
        let Some(table) = self.current_table(upload) else {
            return LoadStatus::Loading;
        };

        let outcome = self.engine().and_then(|engine| engine.prepare(&table).map_err(SessionError::from));

        let mut sessions = self.sessions.write();
        let Some(session) = sessions.get_mut(&upload.session_id) else {
            self.cache.invalidate(table.id());
            return LoadStatus::Failed;
        };
        if session.generation != upload.generation {
            // superseded while computing
            self.cache.invalidate(table.id());
            return session.status;
        }

        match outcome {
            Ok(_) => {
                session.status = LoadStatus::Ready;
                info!(session = %upload.session_id, "Session ready");
            }
            Err(e) => {
                warn!(session = %upload.session_id, error = %e, "Session embeddings failed");
                session.status = LoadStatus::Failed;
                session.error = Some(e.to_string());
            }
        }
        session.status
    }

    fn current_table(&self, upload: Upload) -> Option<Arc<Table>> {
        self.sessions
            .read()
            .get(&upload.session_id)
            .filter(|s| s.generation == upload.generation)
            .map(|s| s.table.clone())
    }

    pub fn info(&self, session_id: SessionId) -> SessionResult<SessionInfo> {
        let sessions = self.sessions.read();
        let session = sessions
            .get(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        Ok(SessionInfo {
            session_id,
            status: session.status,
            rows: session.table.row_count(),
            schema: TableSchema::describe(&session.table),
            error: session.error.clone(),
        })
    }

    pub fn remove(&self, session_id: SessionId) -> bool {
        let removed = self.sessions.write().remove(&session_id);
        match removed {
            Some(session) => {
                self.cache.invalidate(session.table.id());
                info!(session = %session_id, "Session removed");
                true
            }
            None => false,
        }
    }

    /// Answer a question against the session's current table. Blocking while
    /// embeddings are still being computed.
    pub fn ask(&self, session_id: SessionId, question: &str) -> SessionResult<AnswerView> {
        let (table, generation, status, error) = {
            let sessions = self.sessions.read();
            let session = sessions
                .get(&session_id)
                .ok_or(SessionError::NotFound(session_id))?;
            (
                session.table.clone(),
                session.generation,
                session.status,
                session.error.clone(),
            )
        };

        if status == LoadStatus::Failed {
            return Err(SessionError::Unavailable(
                error.unwrap_or_else(|| "embeddings unavailable".to_string()),
            ));
        }

        let engine = self.engine()?;
        let answer = engine.ask(&table, question);
        self.release_if_superseded(session_id, generation, table.id());
        Ok(AnswerView::from_answer(&answer?, &table))
    }

    /// Drop embeddings an in-flight question recomputed for a table that
    /// was replaced or removed meanwhile
    fn release_if_superseded(&self, session_id: SessionId, generation: u64, table_id: TableId) {
        let current = self
            .sessions
            .read()
            .get(&session_id)
            .map(|s| s.generation == generation)
            .unwrap_or(false);
        if !current && self.cache.invalidate(table_id) {
            debug!(session = %session_id, table = %table_id, "Released embeddings of a superseded table");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csvsense_similarity::EmbeddingBackend;

    const CSV: &[u8] = b"nombre,precio\npan,10\nleche,20\nqueso,30\n";

    fn store() -> SessionStore {
        SessionStore::new(
            Arc::new(ModelLoader::new(EmbeddingBackend::Hashing { dim: 64 })),
            EngineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_create_prepare_ask() {
        let store = store();
        let upload = store.create(CSV).unwrap();
        assert_eq!(store.info(upload.session_id).unwrap().status, LoadStatus::Loading);

        assert_eq!(store.prepare(upload), LoadStatus::Ready);
        let info = store.info(upload.session_id).unwrap();
        assert_eq!(info.status, LoadStatus::Ready);
        assert_eq!(info.rows, 3);

        let view = store.ask(upload.session_id, "precio mayor a 15").unwrap();
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.column.as_deref(), Some("precio"));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let store = store();
        let err = store.create(b"a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, SessionError::Table(CoreError::Parse(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_stale_prepare_does_not_overwrite_newer_upload() {
        let store = store();
        let first = store.create(CSV).unwrap();
        let second = store.replace(first.session_id, b"x\n1\n2\n").unwrap();
        assert!(second.generation > first.generation);

        // the first upload's table is gone; its computation is a no-op
        assert_eq!(store.prepare(first), LoadStatus::Loading);
        assert_eq!(store.info(first.session_id).unwrap().status, LoadStatus::Loading);

        assert_eq!(store.prepare(second), LoadStatus::Ready);
        assert_eq!(store.info(second.session_id).unwrap().rows, 2);
    }

    #[test]
    fn test_question_racing_a_replace_leaves_no_stale_embeddings() {
        let store = store();
        let first = store.create(CSV).unwrap();
        assert_eq!(store.prepare(first), LoadStatus::Ready);
        let old_table = store.sessions.read()[&first.session_id].table.clone();

        let second = store.replace(first.session_id, b"x\n1\n2\n").unwrap();
        assert!(store.cache.get(old_table.id()).is_none());

        // a question that started before the replace finishes afterwards
        store.engine().unwrap().ask(&old_table, "pan").unwrap();
        assert!(store.cache.get(old_table.id()).is_some());
        store.release_if_superseded(first.session_id, first.generation, old_table.id());
        assert!(store.cache.get(old_table.id()).is_none());

        // the current table keeps its embeddings
        assert_eq!(store.prepare(second), LoadStatus::Ready);
        store.ask(second.session_id, "1").unwrap();
        let current = store.sessions.read()[&second.session_id].table.id();
        assert!(store.cache.get(current).is_some());
    }

    #[test]
    fn test_failed_model_makes_session_unavailable() {
        let store = SessionStore::new(
            Arc::new(ModelLoader::new(EmbeddingBackend::Hashing { dim: 0 })),
            EngineConfig::default(),
        )
        .unwrap();
        let upload = store.create(CSV).unwrap();

        assert_eq!(store.prepare(upload), LoadStatus::Failed);
        assert!(store.info(upload.session_id).unwrap().error.is_some());
        assert!(matches!(
            store.ask(upload.session_id, "pan"),
            Err(SessionError::Unavailable(_))
        ));
    }

    #[test]
    fn test_replace_and_remove() {
        let store = store();
        let upload = store.create(CSV).unwrap();
        store.prepare(upload);

        assert!(store.replace(upload.session_id, b"a,b\n1\n").is_err());
        assert_eq!(store.info(upload.session_id).unwrap().rows, 3);

        assert!(store.remove(upload.session_id));
        assert!(!store.remove(upload.session_id));
        assert!(matches!(
            store.ask(upload.session_id, "pan"),
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            store.replace(Uuid::new_v4(), CSV),
            Err(SessionError::NotFound(_))
        ));
    }
}
