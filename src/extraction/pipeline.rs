//! Text to transaction candidates.

use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use super::candidate::TransactionCandidate;
use super::payload;
use super::prompts::{extraction_prompt, EXTRACTION_SYSTEM_PROMPT};
use crate::config::ConfigStore;
use crate::gateway::{Conversation, Result, Session, Transport};
use crate::ledger::Category;

/// Asks the model to extract transactions from `source_text`.
///
/// Blank input returns an empty list without calling the provider. An empty
/// result is a success meaning nothing was recognized.
pub async fn extract_transactions(
    store: &ConfigStore,
    transport: &dyn Transport,
    source_text: &str,
    categories: &[Category],
) -> Result<Vec<TransactionCandidate>> {
    if source_text.trim().is_empty() {
        debug!("Skipping extraction of blank text");
        return Ok(Vec::new());
    }

    let prompt = extraction_prompt(source_text, categories);
    let session = Session::new(store, transport, EXTRACTION_SYSTEM_PROMPT);
    let answer = session.ask(&Conversation::single(prompt)).await?;

    candidates_from_answer(&answer, categories, Local::now().date_naive())
}

/// Parses a model answer into normalized candidates.
///
/// A missing or malformed payload is an error; individual elements that fail
/// validation are dropped.
pub fn candidates_from_answer(
    answer: &str,
    categories: &[Category],
    today: NaiveDate,
) -> Result<Vec<TransactionCandidate>> {
    let elements = payload::parse_elements(answer)?;
    let total = elements.len();

    let candidates: Vec<_> = elements
        .iter()
        .filter_map(|element| TransactionCandidate::from_element(element, categories, today))
        .collect();

    info!(
        elements = total,
        candidates = candidates.len(),
        dropped = total - candidates.len(),
        "Extracted transaction candidates"
    );
    Ok(candidates)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::ConfigUpdate;
    use crate::gateway::test_utils::{MockReply, MockTransport};
    use crate::gateway::GatewayError;
    use crate::ledger::TransactionKind;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn usable_store() -> ConfigStore {
        let store = ConfigStore::default();
        store
            .update(ConfigUpdate {
                api_key: Some("sk-test".to_string()),
                enabled: Some(true),
                ..ConfigUpdate::default()
            })
            .unwrap();
        store
    }

    #[test]
    fn keeps_only_positive_amounts() {
        let answer = r#"[{"amount": -5}, {"amount": 0}, {"amount": 12.50, "category": "购物"}]"#;
        let candidates = candidates_from_answer(answer, &Category::defaults(), today()).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].amount, 12.5);
        assert_eq!(candidates[0].category.as_deref(), Some("shopping"));
    }

    #[test]
    fn bracketed_count_before_payload_keeps_transaction() {
        let answer = r#"共识别到[1]笔交易：{"transactions":[{"type":"expense","amount":25.5,"category":"餐饮"}]}"#;
        let candidates = candidates_from_answer(answer, &Category::defaults(), today()).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].amount, 25.5);
        assert_eq!(candidates[0].category.as_deref(), Some("food"));
    }

    #[test]
    fn empty_payload_is_success() {
        let candidates =
            candidates_from_answer(r#"{"transactions": []}"#, &[], today()).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn answer_without_payload_is_parse_error() {
        let err = candidates_from_answer("抱歉，无法识别。", &[], today()).unwrap_err();
        assert!(matches!(err, GatewayError::ExtractionParseError(_)));
    }

    #[tokio::test]
    async fn lunch_receipt_end_to_end() {
        let store = usable_store();
        let answer = "```json\n{\"transactions\": [{\"type\": \"expense\", \"amount\": 25.5, \"category\": \"餐饮\", \"merchant\": \"麦当劳\", \"description\": \"午餐\", \"confidence\": 0.9}]}\n```";
        let transport = MockTransport::new(vec![MockReply::Envelope(json!({
            "choices": [{ "message": { "content": answer } }]
        }))]);
        let categories = vec![Category::new("food", "餐饮"), Category::new("other", "其他")];

        let candidates =
            extract_transactions(&store, &transport, "午餐 麦当劳 25.5元", &categories)
                .await
                .unwrap();

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.kind, TransactionKind::Expense);
        assert_eq!(c.amount, 25.5);
        assert_eq!(c.category.as_deref(), Some("food"));
        assert_eq!(c.merchant, "麦当劳");
        assert!((0.8..=0.95).contains(&c.confidence));

        let request = &transport.requests()[0];
        assert!(!request.streaming);
        let user_turn = request.body["messages"][1]["content"].as_str().unwrap();
        assert!(user_turn.contains("午餐 麦当劳 25.5元"));
        assert_eq!(
            request.body["messages"][0]["content"],
            EXTRACTION_SYSTEM_PROMPT
        );
    }

    #[tokio::test]
    async fn blank_text_makes_no_call() {
        let store = usable_store();
        let transport = MockTransport::new(vec![]);
        let candidates = extract_transactions(&store, &transport, "  \n ", &[]).await.unwrap();
        assert!(candidates.is_empty());
        assert_eq!(transport.request_count(), 0);
    }
}
