use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Deal;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Sink returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// One approved deal as the external record store receives it:
/// percentages as plain decimals, lists comma-joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRow {
    pub deal_id: Uuid,
    pub partner: String,
    pub region: String,
    pub geo: String,
    pub language: String,
    pub source: String,
    pub pricing_model: String,
    pub cpa: Option<f64>,
    pub crg: Option<f64>,
    pub cpl: Option<f64>,
    pub funnels: String,
    pub cr: Option<f64>,
    pub deduction_limit: Option<f64>,
}

impl From<&Deal> for CommitRow {
    fn from(deal: &Deal) -> Self {
        let data = &deal.parsed_data;
        Self {
            deal_id: deal.id,
            partner: data.partner.clone(),
            region: data.region.to_string(),
            geo: data.geo.join(", "),
            language: data.language.clone(),
            source: data.source.join(", "),
            pricing_model: data.pricing_model.as_str().to_string(),
            cpa: data.cpa,
            crg: data.crg,
            cpl: data.cpl,
            funnels: data.funnels.join(", "),
            cr: data.cr,
            deduction_limit: data.deduction_limit,
        }
    }
}

/// Per-row result reported by a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub deal_id: Uuid,
    pub success: bool,
    pub error: Option<String>,
}

impl RowOutcome {
    pub fn ok(deal_id: Uuid) -> Self {
        Self {
            deal_id,
            success: true,
            error: None,
        }
    }

    pub fn failed(deal_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            deal_id,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitReport {
    pub submitted: usize,
    pub outcomes: Vec<RowOutcome>,
}

/// Destination for approved deals.
#[async_trait]
pub trait CommitSink: Send + Sync {
    fn name(&self) -> &str;

    /// Submit every row. An `Err` means nothing could be attempted;
    /// individual row failures are reported in the returned outcomes.
    async fn submit(&self, rows: &[CommitRow]) -> Result<Vec<RowOutcome>, SinkError>;
}

// ═══════════════════════════════════════════════════════════
// HTTP sink: one POST per row
// ═══════════════════════════════════════════════════════════

pub struct HttpSink {
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(url: &str, token: Option<String>, timeout_secs: u64) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SinkError::Http(e.to_string()))?;
        Ok(Self {
            url: url.to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            client,
        })
    }

    async fn post_row(&self, row: &CommitRow) -> Result<(), SinkError> {
        let mut request = self.client.post(&self.url).json(row);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                SinkError::Unavailable(self.url.clone())
            } else {
                SinkError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CommitSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit(&self, rows: &[CommitRow]) -> Result<Vec<RowOutcome>, SinkError> {
        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            match self.post_row(row).await {
                Ok(()) => outcomes.push(RowOutcome::ok(row.deal_id)),
                // Nothing else will get through either
                Err(SinkError::Unavailable(url)) => return Err(SinkError::Unavailable(url)),
                Err(e) => {
                    tracing::warn!(deal_id = %row.deal_id, error = %e, "Sink rejected row");
                    outcomes.push(RowOutcome::failed(row.deal_id, e.to_string()));
                }
            }
        }
        Ok(outcomes)
    }
}

// ═══════════════════════════════════════════════════════════
// Log sink, used when no sink URL is configured
// ═══════════════════════════════════════════════════════════

pub struct LogSink;

#[async_trait]
impl CommitSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn submit(&self, rows: &[CommitRow]) -> Result<Vec<RowOutcome>, SinkError> {
        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            let json = serde_json::to_string(row).map_err(|e| SinkError::Http(e.to_string()))?;
            tracing::info!(deal_id = %row.deal_id, row = %json, "Committed deal");
            outcomes.push(RowOutcome::ok(row.deal_id));
        }
        Ok(outcomes)
    }
}

// ═══════════════════════════════════════════════════════════
// In-memory sink
// ═══════════════════════════════════════════════════════════

/// Collects rows in memory. Can be told to fail specific deals or to be
/// unavailable altogether.
#[derive(Default)]
pub struct MemorySink {
    rows: Mutex<Vec<CommitRow>>,
    failing: Mutex<HashSet<Uuid>>,
    unavailable: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn fail_deal(&self, deal_id: Uuid) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(deal_id);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.clear();
        }
    }

    /// Rows accepted so far.
    pub fn rows(&self) -> Vec<CommitRow> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CommitSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn submit(&self, rows: &[CommitRow]) -> Result<Vec<RowOutcome>, SinkError> {
        if self.unavailable {
            return Err(SinkError::Unavailable("memory sink offline".into()));
        }
        let failing = self
            .failing
            .lock()
            .map_err(|_| SinkError::Unavailable("lock poisoned".into()))?
            .clone();
        let mut stored = self
            .rows
            .lock()
            .map_err(|_| SinkError::Unavailable("lock poisoned".into()))?;

        Ok(rows
            .iter()
            .map(|row| {
                if failing.contains(&row.deal_id) {
                    RowOutcome::failed(row.deal_id, "rejected")
                } else {
                    stored.push(row.clone());
                    RowOutcome::ok(row.deal_id)
                }
            })
            .collect())
    }
}
