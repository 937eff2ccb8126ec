use std::str::FromStr;

use serde_json::{Map, Value};

use super::types::{
    CandidateValue, FieldCandidateSet, RawDealBlock, RawSection, SharedFieldSet,
    StructureAnalysis,
};
use super::LlmError;
use crate::models::{FieldName, Provenance};
use crate::pipeline::normalize::{parse_amount, parse_percentage, percentage_to_decimal};

/// Placeholders the model uses for "not stated".
const ABSENT_MARKERS: &[&str] = &["", "&", "null", "none", "unknown", "n/a", "-"];

fn is_absent(text: &str) -> bool {
    ABSENT_MARKERS.contains(&text.trim().to_lowercase().as_str())
}

/// Pull the JSON object out of a response that may wrap it in a code fence
/// or surround it with prose.
fn extract_json(response: &str) -> Result<&str, LlmError> {
    let trimmed = response.trim();
    if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + 7..];
        let end = body
            .find("```")
            .ok_or_else(|| LlmError::MalformedResponse("Unclosed JSON block".into()))?;
        return Ok(body[..end].trim());
    }
    let start = trimmed
        .find('{')
        .ok_or_else(|| LlmError::MalformedResponse("No JSON object found".into()))?;
    let end = trimmed
        .rfind('}')
        .ok_or_else(|| LlmError::MalformedResponse("Unclosed JSON object".into()))?;
    if end < start {
        return Err(LlmError::MalformedResponse("Unbalanced JSON object".into()));
    }
    Ok(&trimmed[start..=end])
}

fn parse_object(response: &str) -> Result<Map<String, Value>, LlmError> {
    match serde_json::from_str::<Value>(extract_json(response)?)? {
        Value::Object(map) => Ok(map),
        _ => Err(LlmError::MalformedResponse("Top-level value is not an object".into())),
    }
}

// ═══════════════════════════════════════════════════════════
// Structure responses
// ═══════════════════════════════════════════════════════════

/// Parse a structure-analysis response.
///
/// Accepts the sectioned shape `{"sections":[...]}` and the flat shape
/// `{"shared_fields":{...},"deal_blocks":[...]}`. A block whose own
/// `shared_values` differ from its section's context is split into a section
/// of its own so that every block inherits from exactly one shared set.
pub fn parse_structure_response(response: &str) -> Result<StructureAnalysis, LlmError> {
    let root = parse_object(response)?;

    let raw_sections: Vec<&Map<String, Value>> = match root.get("sections") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        Some(_) => {
            return Err(LlmError::MalformedResponse("\"sections\" is not an array".into()))
        }
        None if root.contains_key("deal_blocks") => vec![&root],
        None => {
            return Err(LlmError::MalformedResponse(
                "Neither \"sections\" nor \"deal_blocks\" present".into(),
            ))
        }
    };

    let mut sections = Vec::new();
    for raw in raw_sections {
        sections.extend(parse_section(raw)?);
    }

    if sections.iter().all(|s| s.blocks.is_empty()) {
        return Err(LlmError::MalformedResponse("No deal blocks returned".into()));
    }

    Ok(StructureAnalysis {
        sections,
        degraded: false,
    })
}

fn parse_section(raw: &Map<String, Value>) -> Result<Vec<RawSection>, LlmError> {
    let shared = parse_shared(raw.get("shared_fields"));
    let blocks = match raw.get("deal_blocks") {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(LlmError::MalformedResponse(
                "Section without a \"deal_blocks\" array".into(),
            ))
        }
    };

    let mut main = RawSection {
        text: String::new(),
        shared: shared.clone(),
        blocks: Vec::new(),
    };
    let mut split_off = Vec::new();

    for item in blocks {
        let (text, inherits_from, own_shared) = match item {
            Value::String(text) => (text.clone(), Vec::new(), SharedFieldSet::new()),
            Value::Object(map) => {
                let text = map
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                (text, parse_field_list(map.get("inherits_from")), parse_shared(map.get("shared_values")))
            }
            _ => continue,
        };
        if text.trim().is_empty() {
            continue;
        }

        // Fields named in shared_values are inheritable even when the model
        // forgot to list them.
        let mut inherits_from = inherits_from;
        for (field, _) in own_shared.iter() {
            if !inherits_from.contains(&field) {
                inherits_from.push(field);
            }
        }
        let block = RawDealBlock {
            text,
            inherits_from,
        };

        let effective = shared.merged_with(&own_shared);
        if effective == shared {
            main.blocks.push(block);
        } else {
            split_off.push(RawSection {
                text: block.text.clone(),
                shared: effective,
                blocks: vec![block],
            });
        }
    }

    main.text = main
        .blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let mut sections = Vec::new();
    if !main.blocks.is_empty() {
        sections.push(main);
    }
    sections.extend(split_off);
    Ok(sections)
}

fn parse_shared(value: Option<&Value>) -> SharedFieldSet {
    let mut shared = SharedFieldSet::new();
    if let Some(Value::Object(map)) = value {
        for (key, value) in map {
            let Ok(field) = FieldName::from_str(key) else {
                continue;
            };
            if let Some(text) = value_as_text(value) {
                shared.insert(field, &text);
            }
        }
    }
    shared
}

fn parse_field_list(value: Option<&Value>) -> Vec<FieldName> {
    let mut fields = Vec::new();
    if let Some(Value::Array(items)) = value {
        for item in items.iter().filter_map(Value::as_str) {
            if let Ok(field) = FieldName::from_str(item.trim()) {
                if field.is_shareable() && !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }
    }
    fields
}

/// Flatten a scalar or array value into text, dropping absent markers.
fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !is_absent(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_as_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════
// Candidate responses
// ═══════════════════════════════════════════════════════════

/// Parse a candidate-extraction response into a full candidate set.
///
/// The `{"parsed_data":{...},"metadata":{"confidence_flags":{...}}}` shape
/// is preferred; a bare object of fields is accepted too. Fields missing from
/// the response are tagged empty; values present without a flag are taken as
/// explicit.
pub fn parse_candidate_response(response: &str) -> Result<FieldCandidateSet, LlmError> {
    let root = parse_object(response)?;

    let data = match root.get("parsed_data") {
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(LlmError::MalformedResponse("\"parsed_data\" is not an object".into()))
        }
        None => &root,
    };
    let flags = root
        .get("metadata")
        .and_then(|m| m.get("confidence_flags"))
        .and_then(Value::as_object);

    if !FieldName::ALL.iter().any(|f| data.contains_key(f.as_str())) {
        return Err(LlmError::MalformedResponse("No known fields in response".into()));
    }

    let mut set = FieldCandidateSet::new();
    for field in FieldName::ALL {
        let Some(value) = data.get(field.as_str()).and_then(|v| candidate_value(*field, v))
        else {
            continue;
        };
        let provenance = flags
            .and_then(|f| f.get(field.as_str()))
            .and_then(Value::as_str)
            .and_then(|s| Provenance::from_str(s.trim()).ok())
            .filter(|p| *p != Provenance::Empty)
            .unwrap_or(Provenance::Explicit);
        set.set(*field, value, provenance);
    }
    Ok(set)
}

fn candidate_value(field: FieldName, value: &Value) -> Option<CandidateValue> {
    if field.is_percentage() {
        return match value {
            Value::Number(n) => {
                let n = n.as_f64()?;
                Some(CandidateValue::Number(percentage_to_decimal(n, false)))
            }
            Value::String(s) if !is_absent(s) => parse_percentage(s).map(CandidateValue::Number),
            _ => None,
        };
    }
    if matches!(field, FieldName::Cpa | FieldName::Cpl) {
        return match value {
            Value::Number(n) => n.as_f64().map(CandidateValue::Number),
            Value::String(s) if !is_absent(s) => parse_amount(s).map(CandidateValue::Number),
            _ => None,
        };
    }
    if field.is_list() {
        return match value {
            Value::Array(items) => {
                let list: Vec<String> = items.iter().filter_map(value_as_text).collect();
                (!list.is_empty()).then_some(CandidateValue::List(list))
            }
            other => value_as_text(other).map(CandidateValue::Text),
        };
    }
    value_as_text(value).map(CandidateValue::Text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sectioned_shape() {
        let response = r#"{"sections":[{"shared_fields":{"partner":"Sutra","language":"&"},
            "deal_blocks":[{"text":"AU - 1300+13%","inherits_from":["partner"],"shared_values":{}},
                           {"text":"UK - 1350+10%","inherits_from":["partner"]}]}]}"#;
        let analysis = parse_structure_response(response).unwrap();
        assert_eq!(analysis.sections.len(), 1);
        let section = &analysis.sections[0];
        assert_eq!(section.shared.get(FieldName::Partner), Some("Sutra"));
        assert!(!section.shared.contains(FieldName::Language));
        assert_eq!(section.blocks.len(), 2);
        assert!(section.blocks[0].inherits(FieldName::Partner));
        assert!(!analysis.degraded);
    }

    #[test]
    fn flat_shape_accepted() {
        let response = r#"{"shared_fields":{"partner":"Deum"},"deal_blocks":[{"text":"DE 1200+10%"}]}"#;
        let analysis = parse_structure_response(response).unwrap();
        assert_eq!(analysis.block_count(), 1);
        assert_eq!(analysis.sections[0].shared.get(FieldName::Partner), Some("Deum"));
    }

    #[test]
    fn fenced_json_accepted() {
        let response = "Here you go:\n```json\n{\"deal_blocks\":[\"IT 1000\"]}\n```";
        let analysis = parse_structure_response(response).unwrap();
        assert_eq!(analysis.sections[0].blocks[0].text, "IT 1000");
    }

    #[test]
    fn block_with_own_shared_values_splits_section() {
        let response = r#"{"sections":[{"shared_fields":{"partner":"A"},
            "deal_blocks":[{"text":"DE 1"},{"text":"FR 2","shared_values":{"language":"French"}}]}]}"#;
        let analysis = parse_structure_response(response).unwrap();
        assert_eq!(analysis.sections.len(), 2);
        let split = &analysis.sections[1];
        assert_eq!(split.shared.get(FieldName::Language), Some("French"));
        assert_eq!(split.shared.get(FieldName::Partner), Some("A"));
        assert!(split.blocks[0].inherits(FieldName::Language));
    }

    #[test]
    fn schema_violations_are_errors() {
        assert!(parse_structure_response("not json").is_err());
        assert!(parse_structure_response(r#"{"foo":1}"#).is_err());
        assert!(parse_structure_response(r#"{"sections":"x"}"#).is_err());
        assert!(parse_structure_response(r#"{"sections":[{"deal_blocks":[]}]}"#).is_err());
    }

    #[test]
    fn candidate_response_with_flags() {
        let response = r#"{"parsed_data":{"partner":"Sutra","geo":["AU"],"cpa":1300,
            "crg":"13%","source":["fb"],"language":"Unknown","funnels":[]},
            "metadata":{"confidence_flags":{"partner":"inherited","geo":"explicit","cpa":"explicit"}}}"#;
        let set = parse_candidate_response(response).unwrap();
        assert_eq!(set.provenance(FieldName::Partner), Provenance::Inherited);
        assert_eq!(set.value(FieldName::Cpa), Some(&CandidateValue::Number(1300.0)));
        assert_eq!(set.value(FieldName::Crg), Some(&CandidateValue::Number(0.13)));
        assert_eq!(set.provenance(FieldName::Crg), Provenance::Explicit);
        assert_eq!(set.provenance(FieldName::Language), Provenance::Empty);
        assert_eq!(set.provenance(FieldName::Funnels), Provenance::Empty);
        assert_eq!(set.provenance(FieldName::Cpl), Provenance::Empty);
    }

    #[test]
    fn numeric_percentage_points_converted() {
        let set = parse_candidate_response(r#"{"geo":"DE","crg":10,"cr":0.08}"#).unwrap();
        assert_eq!(set.value(FieldName::Crg), Some(&CandidateValue::Number(0.1)));
        assert_eq!(set.value(FieldName::Cr), Some(&CandidateValue::Number(0.08)));
    }

    #[test]
    fn candidate_response_without_fields_is_error() {
        assert!(parse_candidate_response(r#"{"answer":"none"}"#).is_err());
        assert!(parse_candidate_response(r#"{"parsed_data":[]}"#).is_err());
    }
}
