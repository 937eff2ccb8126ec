//! Pure rendering of review state into display text and the actions a
//! transport should offer alongside it.

use serde::{Deserialize, Serialize};

use super::{ReviewAction, ReviewSession, ReviewSummary, SessionPhase};
use crate::db::{DealStats, DuplicateResult};
use crate::models::{Deal, DealStatus, FieldName, Provenance};
use crate::pipeline::normalize::{format_number, format_percentage};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub label: String,
    pub action: ReviewAction,
}

impl ActionButton {
    fn new(label: impl Into<String>, action: ReviewAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// Display text plus rows of actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedView {
    pub text: String,
    pub actions: Vec<Vec<ActionButton>>,
}

impl RenderedView {
    fn text_only(text: String) -> Self {
        Self {
            text,
            actions: Vec::new(),
        }
    }

    /// Every offered action, row by row.
    pub fn all_actions(&self) -> impl Iterator<Item = ReviewAction> + '_ {
        self.actions.iter().flatten().map(|b| b.action)
    }
}

// ═══════════════════════════════════════════════════════════
// Field display
// ═══════════════════════════════════════════════════════════

const NOT_SET: &str = "N/A";

fn icon(field: FieldName) -> &'static str {
    match field {
        FieldName::Region => "🌍",
        FieldName::Partner => "🤝",
        FieldName::Geo => "🗺",
        FieldName::Language => "🗣",
        FieldName::Source => "📱",
        FieldName::PricingModel => "💰",
        FieldName::Cpa => "💵",
        FieldName::Crg => "📈",
        FieldName::Cpl => "🎯",
        FieldName::Funnels => "🔄",
        FieldName::Cr => "📊",
        FieldName::DeductionLimit => "⚠️",
    }
}

fn list_or_na(items: &[String]) -> String {
    if items.is_empty() {
        NOT_SET.to_string()
    } else {
        items.join(", ")
    }
}

/// Current value of `field` as the user would type it.
pub fn display_value(deal: &Deal, field: FieldName) -> String {
    let data = &deal.parsed_data;
    let amount = |v: Option<f64>| v.map(format_number).unwrap_or_else(|| NOT_SET.into());
    let percent = |v: Option<f64>| v.map(format_percentage).unwrap_or_else(|| NOT_SET.into());
    match field {
        FieldName::Partner => data.partner.clone(),
        FieldName::Region => data.region.to_string(),
        FieldName::Geo => list_or_na(&data.geo),
        FieldName::Language => data.language.clone(),
        FieldName::Source => list_or_na(&data.source),
        FieldName::PricingModel => data.pricing_model.as_str().to_string(),
        FieldName::Cpa => amount(data.cpa),
        FieldName::Crg => percent(data.crg),
        FieldName::Cpl => amount(data.cpl),
        FieldName::Funnels => list_or_na(&data.funnels),
        FieldName::Cr => percent(data.cr),
        FieldName::DeductionLimit => percent(data.deduction_limit),
    }
}

fn provenance_note(flag: Provenance) -> &'static str {
    match flag {
        Provenance::Inherited => " (shared)",
        Provenance::Inferred => " (inferred)",
        Provenance::Explicit | Provenance::Empty => "",
    }
}

fn status_label(status: DealStatus) -> &'static str {
    match status {
        DealStatus::Pending => "⏳ Pending",
        DealStatus::Approved => "✅ Approved",
        DealStatus::Rejected => "❌ Rejected",
    }
}

// Display order, matching how partners usually write deals
const DISPLAY_ORDER: [FieldName; 12] = [
    FieldName::Region,
    FieldName::Partner,
    FieldName::Geo,
    FieldName::Language,
    FieldName::Source,
    FieldName::PricingModel,
    FieldName::Cpa,
    FieldName::Crg,
    FieldName::Cpl,
    FieldName::Funnels,
    FieldName::Cr,
    FieldName::DeductionLimit,
];

// ═══════════════════════════════════════════════════════════
// Views
// ═══════════════════════════════════════════════════════════

/// One deal with its decision buttons and navigation.
pub fn render_deal(deal: &Deal, index: usize, total: usize, statuses: &[DealStatus]) -> RenderedView {
    let status = statuses.get(index).copied().unwrap_or(DealStatus::Pending);
    let mut text = format!("📊 Deal {}/{}  {}\n\n", index + 1, total, status_label(status));
    for field in DISPLAY_ORDER {
        text.push_str(&format!(
            "{} {}: {}{}\n",
            icon(field),
            field.label(),
            display_value(deal, field),
            provenance_note(deal.flag(field)),
        ));
    }

    let mut actions = vec![
        vec![
            ActionButton::new("✅ Approve", ReviewAction::Approve(index)),
            ActionButton::new("❌ Reject", ReviewAction::Reject(index)),
        ],
        vec![ActionButton::new("✏️ Edit", ReviewAction::Edit(index))],
    ];
    let mut nav = Vec::new();
    if index > 0 {
        nav.push(ActionButton::new("⬅️ Previous", ReviewAction::Prev));
    }
    if index + 1 < total {
        nav.push(ActionButton::new("➡️ Next", ReviewAction::Next));
    }
    if !nav.is_empty() {
        actions.push(nav);
    }

    RenderedView {
        text: text.trim_end().to_string(),
        actions,
    }
}

/// End-of-review summary offering commit, discard and reprocess.
pub fn render_summary(summary: &ReviewSummary) -> RenderedView {
    let text = format!(
        "📋 Review complete\n\n✅ Approved: {}\n❌ Rejected: {}\n⏳ Pending: {}\n📦 Total: {}",
        summary.approved, summary.rejected, summary.pending, summary.total
    );
    let mut first_row = Vec::new();
    if summary.approved > 0 {
        first_row.push(ActionButton::new("📤 Commit", ReviewAction::Commit));
    }
    first_row.push(ActionButton::new("🗑 Discard", ReviewAction::Discard));
    RenderedView {
        text,
        actions: vec![
            first_row,
            vec![ActionButton::new("🔁 Review again", ReviewAction::Reprocess)],
        ],
    }
}

/// Field picker for one deal, two fields per row.
pub fn render_field_menu(index: usize) -> RenderedView {
    let mut actions: Vec<Vec<ActionButton>> = DISPLAY_ORDER
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|f| ActionButton::new(f.label(), ReviewAction::EditField(index, *f)))
                .collect()
        })
        .collect();
    actions.push(vec![ActionButton::new("🔙 Back", ReviewAction::Back)]);
    RenderedView {
        text: format!("✏️ Which field of deal {} should change?", index + 1),
        actions,
    }
}

/// Prompt for the new value of a field, with its current value and format.
pub fn render_edit_prompt(deal: &Deal, field: FieldName) -> RenderedView {
    RenderedView {
        text: format!(
            "✏️ {}\nCurrent: {}\nSend the new value as {}.",
            field.label(),
            display_value(deal, field),
            field.expected_format()
        ),
        actions: vec![vec![ActionButton::new("🔙 Back", ReviewAction::Back)]],
    }
}

/// Whatever the session should show right now.
pub fn render_session(session: &ReviewSession) -> RenderedView {
    if let Some(pending) = session.editing() {
        if let Some(deal) = session.deals().get(pending.index) {
            return render_edit_prompt(deal, pending.field);
        }
    }
    match session.phase() {
        SessionPhase::Complete => render_summary(&session.summary()),
        SessionPhase::Committed => RenderedView::text_only("📤 Deals committed.".into()),
        SessionPhase::Discarded => RenderedView::text_only("🗑 Review discarded.".into()),
        SessionPhase::Reviewing => match session.current_deal() {
            Some(deal) => render_deal(deal, session.current_index(), session.len(), session.statuses()),
            None => RenderedView::text_only("No deals to review.".into()),
        },
    }
}

/// Notice listing deals skipped as duplicates.
pub fn render_duplicates(duplicates: &[(Deal, DuplicateResult)]) -> String {
    let mut text = format!("♻️ Skipped {} duplicate deal(s):", duplicates.len());
    for (deal, result) in duplicates {
        let reason = result.reason.map(|r| r.as_str()).unwrap_or("Duplicate");
        text.push_str(&format!(
            "\n• {} {}: {}",
            deal.parsed_data.partner,
            list_or_na(&deal.parsed_data.geo),
            reason
        ));
        if let Some(seen) = result.first_seen_at {
            text.push_str(&format!(" (first seen {})", seen.format("%Y-%m-%d %H:%M UTC")));
        }
    }
    text
}

pub fn render_stats(stats: &DealStats) -> String {
    format!(
        "📈 Deal statistics\n\nTotal deals processed: {}\nUnique geos: {}\nGeos: {}\nUnique partners: {}\nPartners: {}",
        stats.total_deals,
        stats.unique_geos,
        list_or_na(&stats.geos),
        stats.unique_partners,
        list_or_na(&stats.partners),
    )
}
