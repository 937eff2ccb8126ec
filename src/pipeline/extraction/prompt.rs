use super::llm::ChatMessage;
use super::types::SharedFieldSet;

/// System prompt for segmenting a message into sections and deal blocks.
pub const STRUCTURE_SYSTEM_PROMPT: &str = r#"You segment advertising deal messages.

A message contains one or more sections. A section groups deal blocks that share context, usually one partner. Fields stated once for a whole section are shared fields. Only these fields can be shared: partner, language, source, pricing_model, deduction_limit.

A deal block starts at a line beginning with a country code (e.g. "DE", "AU -"), a flag emoji, or "GEO:". Lines before the first block of a section hold shared fields.

Return JSON only, in this shape:
{"sections":[{"shared_fields":{"partner":"...","language":"...","source":"...","pricing_model":"...","deduction_limit":"..."},"deal_blocks":[{"text":"exact block text","inherits_from":["partner"],"shared_values":{}}]}]}

Copy block text verbatim. Omit shared fields that are not stated."#;

/// System prompt for extracting the fields of one deal block.
pub const CANDIDATES_SYSTEM_PROMPT: &str = r#"You extract fields from one advertising deal.

Fields: partner, region, geo, language, source, pricing_model, cpa, crg, cpl, funnels, cr, deduction_limit.
- geo: list of two-letter country codes.
- source, funnels: lists of names in the order written.
- pricing_model: one of "CPA", "CPL", "CPA/CRG".
- cpa, cpl: numbers. crg, cr, deduction_limit: percentages as written, e.g. "13%".
- language: default "Native" when not stated.
Use null for anything not stated.

For every field give a confidence flag: "explicit" (written in the block), "inherited" (taken from the shared context), "inferred" (derived), or "empty".

Return JSON only:
{"parsed_data":{...},"metadata":{"confidence_flags":{...}}}"#;

/// Messages for the structure-analysis call.
pub fn build_structure_messages(text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(STRUCTURE_SYSTEM_PROMPT),
        ChatMessage::user(format!("Message:\n{text}")),
    ]
}

/// Messages for one block's candidate extraction, with its shared context.
pub fn build_candidate_messages(block_text: &str, shared: &SharedFieldSet) -> Vec<ChatMessage> {
    let mut user = String::new();
    if !shared.is_empty() {
        user.push_str("Shared context:\n");
        for (field, value) in shared.iter() {
            user.push_str(&format!("- {field}: {value}\n"));
        }
        user.push('\n');
    }
    user.push_str("Deal:\n");
    user.push_str(block_text);

    vec![
        ChatMessage::system(CANDIDATES_SYSTEM_PROMPT),
        ChatMessage::user(user),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldName;

    #[test]
    fn structure_messages_carry_text() {
        let messages = build_structure_messages("AU - 1300");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("AU - 1300"));
    }

    #[test]
    fn candidate_messages_include_shared_context() {
        let mut shared = SharedFieldSet::new();
        shared.insert(FieldName::Partner, "Sutra");
        let messages = build_candidate_messages("AU - 1300+13%", &shared);
        assert!(messages[1].content.contains("- partner: Sutra"));
        assert!(messages[1].content.ends_with("AU - 1300+13%"));
    }

    #[test]
    fn candidate_messages_without_shared_context() {
        let messages = build_candidate_messages("DE", &SharedFieldSet::new());
        assert!(!messages[1].content.contains("Shared context"));
    }
}
