//! Append-only deal history keyed by two independent hashes.
//!
//! A deal is a duplicate when either the verbatim block text was seen before
//! (exact text match) or another recorded deal canonicalizes to the same
//! content hash (similar deal). Recording writes the text hash and the deal
//! row in one transaction, so a reader never sees one without the other.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use base64::Engine;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::DatabaseError;
use crate::models::{Deal, DealData};

/// Why a deal was rejected as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateReason {
    ExactText,
    SimilarDeal,
}

impl DuplicateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateReason::ExactText => "Exact text match",
            DuplicateReason::SimilarDeal => "Similar deal exists",
        }
    }
}

impl std::fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateResult {
    pub is_duplicate: bool,
    pub reason: Option<DuplicateReason>,
    /// The previously recorded deal, when one can be read back.
    pub existing: Option<Deal>,
    pub first_seen_at: Option<DateTime<Utc>>,
}

impl DuplicateResult {
    fn fresh() -> Self {
        Self {
            is_duplicate: false,
            reason: None,
            existing: None,
            first_seen_at: None,
        }
    }

    fn duplicate(reason: DuplicateReason, existing: Option<Deal>, seen: DateTime<Utc>) -> Self {
        Self {
            is_duplicate: true,
            reason: Some(reason),
            existing,
            first_seen_at: Some(seen),
        }
    }
}

/// Aggregate view of the recorded history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealStats {
    pub total_deals: u64,
    pub unique_geos: usize,
    pub unique_partners: usize,
    /// Sorted.
    pub geos: Vec<String>,
    /// Sorted.
    pub partners: Vec<String>,
}

// ═══════════════════════════════════════════════════════════
// Hashing
// ═══════════════════════════════════════════════════════════

fn digest(input: &str) -> String {
    let hash = Sha256::digest(input.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hash)
}

/// Hash of the verbatim block text, ignoring surrounding whitespace.
pub fn text_hash(raw_text: &str) -> String {
    digest(raw_text.trim())
}

fn canonical_number(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

/// Digest over the canonical identity of a deal. Field order is fixed; list
/// members are case-folded, and funnels are sorted since their order carries
/// no meaning.
pub fn content_hash(data: &DealData) -> String {
    let geo: Vec<String> = data.geo.iter().map(|g| g.to_uppercase()).collect();
    let source: Vec<String> = data.source.iter().map(|s| s.to_lowercase()).collect();
    let mut funnels: Vec<String> = data.funnels.iter().map(|f| f.to_lowercase()).collect();
    funnels.sort();

    let canonical = [
        format!("geo={}", geo.join(",")),
        format!("cpa={}", canonical_number(data.cpa)),
        format!("crg={}", canonical_number(data.crg)),
        format!("cpl={}", canonical_number(data.cpl)),
        format!("source={}", source.join(",")),
        format!("funnels={}", funnels.join(",")),
        format!("partner={}", data.partner.to_lowercase()),
    ]
    .join("|");
    digest(&canonical)
}

// ═══════════════════════════════════════════════════════════
// Store
// ═══════════════════════════════════════════════════════════

/// Deduplicating deal history over a single shared connection.
#[derive(Clone)]
pub struct DedupStore {
    conn: Arc<Mutex<Connection>>,
}

impl DedupStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Check `deal` against history and record it when it is new.
    ///
    /// The text hash is checked first. Duplicates are not recorded again, so
    /// calling this twice with the same deal leaves the record count unchanged.
    pub fn check_and_record(
        &self,
        raw_text: &str,
        deal: &Deal,
    ) -> Result<DuplicateResult, DatabaseError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let result = check_and_record_in(&tx, raw_text, deal)?;
        tx.commit()?;
        Ok(result)
    }

    /// Check and record every deal of one message in a single transaction.
    ///
    /// Either all fresh deals are recorded or none are: on error the
    /// transaction rolls back, so the same message can be submitted again.
    /// Results are in input order; a deal repeated within the batch is a
    /// duplicate of its first occurrence.
    pub fn check_and_record_all(&self, deals: &[Deal]) -> Result<Vec<DuplicateResult>, DatabaseError> {
        let span = tracing::info_span!("check_and_record_all", deals = deals.len());
        let _guard = span.enter();

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let results = deals
            .iter()
            .map(|deal| check_and_record_in(&tx, &deal.raw_text, deal))
            .collect::<Result<Vec<_>, _>>()?;
        tx.commit()?;
        Ok(results)
    }

    /// The recorded deal with this content hash, if any.
    pub fn find_by_content_hash(&self, hash: &str) -> Result<Option<Deal>, DatabaseError> {
        let conn = self.lock()?;
        Ok(query_deal(&conn, "content_hash", hash)?.map(|(deal, _)| deal))
    }

    pub fn count(&self) -> Result<u64, DatabaseError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM deals", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn stats(&self) -> Result<DealStats, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT geo, partner FROM deals")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut total = 0u64;
        let mut geos = BTreeSet::new();
        let mut partners = BTreeSet::new();
        for row in rows {
            let (geo, partner) = row?;
            total += 1;
            geos.extend(geo.split(',').filter(|g| !g.is_empty()).map(str::to_string));
            partners.insert(partner);
        }

        Ok(DealStats {
            total_deals: total,
            unique_geos: geos.len(),
            unique_partners: partners.len(),
            geos: geos.into_iter().collect(),
            partners: partners.into_iter().collect(),
        })
    }
}

/// Dedup check plus insert, inside a transaction owned by the caller.
fn check_and_record_in(
    conn: &Connection,
    raw_text: &str,
    deal: &Deal,
) -> Result<DuplicateResult, DatabaseError> {
    let span = tracing::debug_span!("check_and_record", deal_id = %deal.id);
    let _guard = span.enter();

    let t_hash = text_hash(raw_text);
    let seen: Option<DateTime<Utc>> = conn
        .query_row(
            "SELECT created_at FROM seen_text_hashes WHERE hash = ?1",
            params![t_hash],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(seen_at) = seen {
        let existing = query_deal(conn, "text_hash", &t_hash)?.map(|(deal, _)| deal);
        tracing::info!(reason = %DuplicateReason::ExactText, "Duplicate deal");
        return Ok(DuplicateResult::duplicate(DuplicateReason::ExactText, existing, seen_at));
    }

    let c_hash = content_hash(&deal.parsed_data);
    if let Some((existing, created_at)) = query_deal(conn, "content_hash", &c_hash)? {
        tracing::info!(reason = %DuplicateReason::SimilarDeal, existing = %existing.id, "Duplicate deal");
        return Ok(DuplicateResult::duplicate(
            DuplicateReason::SimilarDeal,
            Some(existing),
            created_at,
        ));
    }

    let now = Utc::now();
    let data = &deal.parsed_data;
    conn.execute(
        "INSERT INTO seen_text_hashes (hash, created_at) VALUES (?1, ?2)",
        params![t_hash, now],
    )?;
    conn.execute(
        "INSERT INTO deals (id, content_hash, text_hash, raw_text, partner, region, geo,
         language, source, pricing_model, cpa, crg, cpl, funnels, cr, deduction_limit,
         record, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            deal.id.to_string(),
            c_hash,
            t_hash,
            deal.raw_text,
            data.partner,
            data.region.to_string(),
            data.geo.join(","),
            data.language,
            data.source.join(","),
            data.pricing_model.as_str(),
            data.cpa,
            data.crg,
            data.cpl,
            data.funnels.join(","),
            data.cr,
            data.deduction_limit,
            serde_json::to_string(deal)?,
            now,
        ],
    )?;

    tracing::debug!(deal_id = %deal.id, "Deal recorded");
    Ok(DuplicateResult::fresh())
}

/// Oldest deal whose `column` equals `value`, with its recording time.
fn query_deal(
    conn: &Connection,
    column: &str,
    value: &str,
) -> Result<Option<(Deal, DateTime<Utc>)>, DatabaseError> {
    let sql = match column {
        "content_hash" => "SELECT record, created_at FROM deals WHERE content_hash = ?1",
        _ => "SELECT record, created_at FROM deals WHERE text_hash = ?1 ORDER BY created_at LIMIT 1",
    };
    let row: Option<(String, DateTime<Utc>)> = conn
        .query_row(sql, params![value], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()?;
    match row {
        Some((record, created_at)) => Ok(Some((serde_json::from_str(&record)?, created_at))),
        None => Ok(None),
    }
}
