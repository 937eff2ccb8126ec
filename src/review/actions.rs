use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ReviewError;
use crate::models::FieldName;

/// A user action on a review session, in the compact form a transport
/// attaches to a button and routes back (`approve:2`, `edit:1:crg`, `next`).
/// Indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewAction {
    Next,
    Prev,
    Approve(usize),
    Reject(usize),
    /// Open the field menu for a deal.
    Edit(usize),
    EditField(usize, FieldName),
    /// Leave the field menu or abandon a pending edit.
    Back,
    Commit,
    Discard,
    Reprocess,
}

impl ReviewAction {
    pub fn encode(&self) -> String {
        match self {
            ReviewAction::Next => "next".into(),
            ReviewAction::Prev => "prev".into(),
            ReviewAction::Approve(i) => format!("approve:{i}"),
            ReviewAction::Reject(i) => format!("reject:{i}"),
            ReviewAction::Edit(i) => format!("edit:{i}"),
            ReviewAction::EditField(i, field) => format!("edit:{i}:{field}"),
            ReviewAction::Back => "back".into(),
            ReviewAction::Commit => "commit".into(),
            ReviewAction::Discard => "discard".into(),
            ReviewAction::Reprocess => "reprocess".into(),
        }
    }

    pub fn decode(raw: &str) -> Result<Self, ReviewError> {
        let invalid = || ReviewError::InvalidAction(raw.to_string());
        let parts: Vec<&str> = raw.trim().split(':').collect();
        let index = |i: usize| -> Result<usize, ReviewError> {
            parts.get(i).and_then(|p| p.parse().ok()).ok_or_else(invalid)
        };

        let action = match parts.as_slice() {
            ["next"] => ReviewAction::Next,
            ["prev"] => ReviewAction::Prev,
            ["approve", _] => ReviewAction::Approve(index(1)?),
            ["reject", _] => ReviewAction::Reject(index(1)?),
            ["edit", _] => ReviewAction::Edit(index(1)?),
            ["edit", _, field] => {
                let field = FieldName::from_str(field)
                    .map_err(|_| ReviewError::UnknownField(field.to_string()))?;
                ReviewAction::EditField(index(1)?, field)
            }
            ["back"] => ReviewAction::Back,
            ["commit"] => ReviewAction::Commit,
            ["discard"] => ReviewAction::Discard,
            ["reprocess"] => ReviewAction::Reprocess,
            _ => return Err(invalid()),
        };
        Ok(action)
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ReviewAction {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
