//! Transport-agnostic application state.
//!
//! `CoreState` owns the pipeline, the dedup store, the live review sessions
//! and the commit sink. A transport hands it a user id plus either free text
//! or a [`ReviewAction`] and gets back notices and the view to display.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rusqlite::Connection;
use thiserror::Error;

use crate::config::{self, Settings};
use crate::db::{self, DatabaseError, DealStats, DedupStore, DuplicateResult, SessionSnapshotRepo};
use crate::models::{Deal, StrategyKind};
use crate::pipeline::extraction::{
    ExtractionStrategy, MistralClient, ModelStrategy, PatternStrategy, RetryPolicy,
};
use crate::pipeline::processor::DealPipeline;
use crate::pipeline::resolve::ResolveOptions;
use crate::review::{
    render_duplicates, render_field_menu, render_session, CommitSink, HttpSink, LogSink,
    PendingEdit, RenderedView, ReviewAction, ReviewError, ReviewSession, SessionStore,
};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("No review session in progress")]
    NoSession,
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error("Storage unavailable, please retry: {0}")]
    Persistence(#[from] DatabaseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a transport should show after handling one input.
#[derive(Debug, Clone, Default)]
pub struct CoreReply {
    /// Informational lines shown before the view.
    pub notices: Vec<String>,
    pub view: Option<RenderedView>,
}

impl CoreReply {
    fn view(view: RenderedView) -> Self {
        Self {
            notices: Vec::new(),
            view: Some(view),
        }
    }

    fn notice(text: impl Into<String>) -> Self {
        Self {
            notices: vec![text.into()],
            view: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    pipeline: DealPipeline,
    dedup: DedupStore,
    snapshots: SessionSnapshotRepo,
    sessions: SessionStore,
    sink: Arc<dyn CommitSink>,
    pub inactivity_timeout: Duration,
}

impl CoreState {
    pub fn new(pipeline: DealPipeline, conn: Connection, sink: Arc<dyn CommitSink>) -> Self {
        let conn = Arc::new(Mutex::new(conn));
        Self {
            pipeline,
            dedup: DedupStore::new(conn.clone()),
            snapshots: SessionSnapshotRepo::new(conn),
            sessions: SessionStore::new(),
            sink,
            inactivity_timeout: config::SESSION_INACTIVITY_TIMEOUT,
        }
    }

    /// Wire everything from settings: database under the data directory,
    /// extraction strategy and commit sink.
    pub fn from_settings(settings: &Settings) -> Result<Self, CoreError> {
        let conn = db::open_database(&settings.database_path())?;
        let pipeline = DealPipeline::new(build_strategy(settings));
        let state = Self::new(pipeline, conn, build_sink(settings));
        tracing::info!(
            strategy = %state.pipeline.strategy().kind(),
            sink = state.sink.name(),
            db = %settings.database_path().display(),
            "Core state ready"
        );
        Ok(state)
    }

    /// Open an existing data directory with the default pattern strategy.
    pub fn open(data_dir: &Path, sink: Arc<dyn CommitSink>) -> Result<Self, CoreError> {
        let conn = db::open_database(&data_dir.join(config::DATABASE_FILE))?;
        let pipeline = DealPipeline::new(Arc::new(PatternStrategy::new()));
        Ok(Self::new(pipeline, conn, sink))
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn stats(&self) -> Result<DealStats, CoreError> {
        Ok(self.dedup.stats()?)
    }

    /// What the user's session currently shows, if there is one.
    pub async fn current_view(&self, user_id: &str) -> Result<Option<RenderedView>, CoreError> {
        match self.sessions.get(user_id)? {
            Some(handle) => Ok(Some(render_session(&*handle.lock().await))),
            None => Ok(None),
        }
    }

    /// Index of the deal on screen.
    pub async fn current_index(&self, user_id: &str) -> Result<Option<usize>, CoreError> {
        match self.sessions.get(user_id)? {
            Some(handle) => Ok(Some(handle.lock().await.current_index())),
            None => Ok(None),
        }
    }

    pub async fn pending_edit(&self, user_id: &str) -> Result<Option<PendingEdit>, CoreError> {
        match self.sessions.get(user_id)? {
            Some(handle) => Ok(handle.lock().await.editing()),
            None => Ok(None),
        }
    }

    // ── Inbound text ────────────────────────────────────────

    /// Free text is either the value for a pending field edit or a new
    /// message to extract deals from.
    pub async fn handle_text(&self, user_id: &str, text: &str) -> Result<CoreReply, CoreError> {
        if let Some(handle) = self.sessions.get(user_id)? {
            let mut session = handle.lock().await;
            if session.editing().is_some() && self.sessions.holds(user_id, &handle)? {
                session.submit_edit(text)?;
                self.persist(&session);
                return Ok(CoreReply::view(render_session(&session)));
            }
        }
        self.ingest(user_id, text).await
    }

    /// Extract, deduplicate and open a new review session holding the fresh
    /// deals. A storage failure records nothing and leaves any previous
    /// session untouched.
    async fn ingest(&self, user_id: &str, text: &str) -> Result<CoreReply, CoreError> {
        let report = self.pipeline.process(text).await;

        // One transaction for the whole message, so a storage failure leaves
        // nothing recorded and the message can be sent again.
        let results = self.dedup.check_and_record_all(&report.deals)?;
        let mut fresh: Vec<Deal> = Vec::new();
        let mut duplicates: Vec<(Deal, DuplicateResult)> = Vec::new();
        for (deal, result) in report.deals.into_iter().zip(results) {
            if result.is_duplicate {
                duplicates.push((deal, result));
            } else {
                fresh.push(deal);
            }
        }

        let mut reply = CoreReply::default();
        if report.degraded {
            reply
                .notices
                .push("⚠️ Extraction was only partly successful; please check every field.".into());
        }
        for failure in &report.failures {
            reply.notices.push(format!(
                "⚠️ Block {} skipped: {}",
                failure.block_index + 1,
                failure.error
            ));
        }
        if !duplicates.is_empty() {
            reply.notices.push(render_duplicates(&duplicates));
        }

        tracing::info!(
            user_id = %user_id,
            fresh = fresh.len(),
            duplicates = duplicates.len(),
            failures = report.failures.len(),
            "Message ingested"
        );

        if fresh.is_empty() {
            reply.notices.push("No new deals found.".into());
            return Ok(reply);
        }

        let session = ReviewSession::new(user_id, fresh);
        let view = render_session(&session);
        self.persist(&session);
        self.sessions.insert(session)?;
        reply.view = Some(view);
        Ok(reply)
    }

    // ── Actions ─────────────────────────────────────────────

    pub async fn handle_action(&self, user_id: &str, action: ReviewAction) -> Result<CoreReply, CoreError> {
        let handle = self.sessions.get(user_id)?.ok_or(CoreError::NoSession)?;
        let mut session = handle.lock().await;
        // Expired or replaced while we waited for the lock
        if !self.sessions.holds(user_id, &handle)? {
            return Err(CoreError::NoSession);
        }

        match action {
            ReviewAction::Next => {
                session.next();
            }
            ReviewAction::Prev => {
                session.prev();
            }
            ReviewAction::Approve(index) => {
                session.approve(index)?;
            }
            ReviewAction::Reject(index) => {
                session.reject(index)?;
            }
            ReviewAction::Edit(index) => {
                if index >= session.len() {
                    return Err(ReviewError::IndexOutOfRange { index, len: session.len() }.into());
                }
                session.touch();
                return Ok(CoreReply::view(render_field_menu(index)));
            }
            ReviewAction::EditField(index, field) => {
                session.begin_edit(index, field)?;
            }
            ReviewAction::Back => {
                session.cancel_edit();
            }
            ReviewAction::Reprocess => {
                session.reprocess()?;
            }
            ReviewAction::Commit => {
                let report = session.commit(self.sink.as_ref()).await?;
                self.close(user_id);
                let mut reply = CoreReply::notice(format!("📤 Committed {} deal(s).", report.submitted));
                reply.view = Some(render_session(&session));
                return Ok(reply);
            }
            ReviewAction::Discard => {
                session.discard();
                self.close(user_id);
                return Ok(CoreReply::view(render_session(&session)));
            }
        }

        self.persist(&session);
        Ok(CoreReply::view(render_session(&session)))
    }

    // ── Session lifecycle ───────────────────────────────────

    /// Reclaim idle sessions together with their snapshots.
    pub fn expire_idle_sessions(&self) -> Result<Vec<String>, CoreError> {
        let expired = self.sessions.expire_idle(self.inactivity_timeout)?;
        for user_id in &expired {
            if let Err(e) = self.snapshots.delete(user_id) {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to delete expired session snapshot");
            }
        }
        Ok(expired)
    }

    /// Load persisted sessions. Idle or closed snapshots are deleted
    /// instead of restored.
    pub fn restore_sessions(&self) -> Result<usize, CoreError> {
        let now = Utc::now();
        let mut restored = 0;
        for (user_id, session) in self.snapshots.load_all::<ReviewSession>()? {
            if session.phase().is_terminal() || session.is_idle(now, self.inactivity_timeout) {
                self.snapshots.delete(&user_id)?;
                continue;
            }
            self.sessions.insert(session)?;
            restored += 1;
        }
        tracing::info!(restored, "Review sessions restored");
        Ok(restored)
    }

    fn close(&self, user_id: &str) {
        if let Err(e) = self.sessions.remove(user_id) {
            tracing::error!(user_id = %user_id, error = %e, "Failed to remove review session");
        }
        if let Err(e) = self.snapshots.delete(user_id) {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to delete session snapshot");
        }
    }

    /// Best effort: the in-memory session stays authoritative.
    fn persist(&self, session: &ReviewSession) {
        if let Err(e) = self.snapshots.save(session.user_id(), session) {
            tracing::warn!(user_id = %session.user_id(), error = %e, "Failed to save session snapshot");
        }
    }
}

fn build_strategy(settings: &Settings) -> Arc<dyn ExtractionStrategy> {
    if settings.strategy == StrategyKind::Model {
        if let Some(key) = &settings.api_key {
            match MistralClient::new(&settings.model_url, key, &settings.model, settings.model_timeout_secs) {
                Ok(client) => {
                    let options = ResolveOptions::for_model().with_geo_language(settings.geo_language);
                    return Arc::new(
                        ModelStrategy::new(
                            Arc::new(client),
                            RetryPolicy::default(),
                            Duration::from_secs(settings.model_timeout_secs),
                        )
                        .with_options(options),
                    );
                }
                Err(e) => tracing::warn!(error = %e, "Model client unavailable, using pattern extraction"),
            }
        }
    }
    let options = ResolveOptions::for_pattern().with_geo_language(settings.geo_language);
    Arc::new(PatternStrategy::with_options(options))
}

fn build_sink(settings: &Settings) -> Arc<dyn CommitSink> {
    if let Some(url) = &settings.sink_url {
        match HttpSink::new(url, settings.sink_token.clone(), config::SINK_TIMEOUT_SECS) {
            Ok(sink) => return Arc::new(sink),
            Err(e) => tracing::warn!(error = %e, "HTTP sink unavailable, logging commits instead"),
        }
    }
    Arc::new(LogSink)
}
