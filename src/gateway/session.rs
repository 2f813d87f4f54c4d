//! One question/answer exchange with the configured provider.

use std::pin::Pin;

use futures::{future, Stream, StreamExt};
use tracing::{debug, info};

use super::error::{GatewayError, Result};
use super::format;
use super::message::Conversation;
use super::normalize;
use super::provider::{self, ProviderProfile};
use super::stream::FrameStream;
use super::transport::{TextResult, Transport};
use crate::config::ConfigStore;

/// Incremental text deltas of one call.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Caller callback invoked once per non-empty delta.
pub type FragmentCallback<'c> = dyn FnMut(&StreamFragment<'_>) -> anyhow::Result<()> + Send + 'c;

/// One incremental update delivered to a fragment callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFragment<'a> {
    /// Text received since the previous fragment.
    pub delta: &'a str,
    /// Concatenation of every delta so far, including this one.
    pub text: &'a str,
}

/// Orchestrates formatting, transport and normalization for one call.
///
/// A session holds no conversation state of its own; every call carries the
/// full [`Conversation`].
#[derive(Clone, Copy)]
pub struct Session<'a> {
    store: &'a ConfigStore,
    transport: &'a dyn Transport,
    system_prompt: &'a str,
}

impl<'a> Session<'a> {
    /// Creates a session over a store and transport.
    pub fn new(
        store: &'a ConfigStore,
        transport: &'a dyn Transport,
        system_prompt: &'a str,
    ) -> Self {
        Self {
            store,
            transport,
            system_prompt,
        }
    }

    /// Asks without incremental delivery and returns the final text.
    pub async fn ask(&self, conversation: &Conversation) -> Result<String> {
        self.exchange(conversation, None).await
    }

    /// Asks with incremental delivery.
    ///
    /// Streams when the provider supports it. Otherwise the whole answer is
    /// delivered as a single fragment. An `Err` from the callback aborts the
    /// call with [`GatewayError::CallbackError`].
    pub async fn ask_streaming<F>(
        &self,
        conversation: &Conversation,
        mut on_fragment: F,
    ) -> Result<String>
    where
        F: FnMut(&StreamFragment<'_>) -> anyhow::Result<()> + Send,
    {
        let callback: &mut FragmentCallback<'_> = &mut on_fragment;
        self.exchange(conversation, Some(callback)).await
    }

    async fn exchange(
        &self,
        conversation: &Conversation,
        on_fragment: Option<&mut FragmentCallback<'_>>,
    ) -> Result<String> {
        let config = self.store.load();
        if !config.is_usable() {
            return Err(GatewayError::InvalidConfig(if config.enabled {
                "API key is not set".to_string()
            } else {
                "AI features are disabled".to_string()
            }));
        }

        let profile = provider::profile(&config.provider)?;
        let request = format::format(
            profile,
            &config,
            conversation,
            self.system_prompt,
            on_fragment.is_some(),
        )?;

        let text = match self.transport.send(&request).await? {
            TextResult::Complete(envelope) => {
                let text = normalize::extract(profile, &envelope)?;
                if let Some(callback) = on_fragment {
                    if !text.is_empty() {
                        notify(callback, &text, &text)?;
                    }
                }
                text
            }
            TextResult::Stream(frames) => accumulate(deltas(profile, frames), on_fragment).await?,
        };

        let usage = self.store.record_call();
        info!(
            provider = profile.id,
            model = %config.model,
            streamed = request.streaming,
            response_len = text.len(),
            monthly = usage.monthly,
            "AI call completed"
        );
        Ok(text)
    }
}

/// Maps decoded frames to text deltas.
///
/// Frames without text are skipped. An error event from the provider ends
/// the stream with [`GatewayError::ProviderError`] so the partial answer is
/// never reported as a success.
pub(crate) fn deltas(profile: &'static ProviderProfile, frames: FrameStream) -> DeltaStream {
    Box::pin(frames.filter_map(move |frame| {
        future::ready(match frame {
            Ok(value) => match normalize::stream_error(&value) {
                Some(message) => {
                    debug!(
                        provider = profile.id,
                        message = %message,
                        "Provider error event in stream"
                    );
                    Some(Err(GatewayError::ProviderError {
                        status: 200,
                        message,
                    }))
                }
                None => normalize::extract_delta(profile, &value).map(Ok),
            },
            Err(e) => Some(Err(e)),
        })
    }))
}

/// Drains a delta stream into one buffer, notifying the callback per delta.
///
/// Empty deltas are skipped. The first stream or callback error ends the
/// call and the partial buffer is dropped.
pub(crate) async fn accumulate(
    mut deltas: DeltaStream,
    mut on_fragment: Option<&mut FragmentCallback<'_>>,
) -> Result<String> {
    let mut text = String::new();
    let mut fragments = 0usize;

    while let Some(delta) = deltas.next().await {
        let delta = delta?;
        if delta.is_empty() {
            continue;
        }
        text.push_str(&delta);
        fragments += 1;
        if let Some(callback) = on_fragment.as_deref_mut() {
            notify(callback, &delta, &text)?;
        }
    }

    debug!(fragments, response_len = text.len(), "Stream complete");
    Ok(text)
}

fn notify(callback: &mut FragmentCallback<'_>, delta: &str, text: &str) -> Result<()> {
    callback(&StreamFragment { delta, text }).map_err(|e| {
        debug!(error = %e, "Fragment callback failed, aborting call");
        GatewayError::CallbackError(format!("{e:#}"))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{AiSettings, ConfigUpdate, UsageCounters};
    use crate::gateway::test_utils::{sse_body, MockReply, MockTransport};
    use crate::gateway::Message;
    use serde_json::json;

    fn usable_store(provider: &str) -> ConfigStore {
        let store = ConfigStore::new(AiSettings::default(), UsageCounters::default());
        store
            .update(ConfigUpdate {
                provider: Some(provider.to_string()),
                api_key: Some("sk-test".to_string()),
                enabled: Some(true),
                ..ConfigUpdate::default()
            })
            .unwrap();
        store
    }

    fn chat_envelope(text: &str) -> serde_json::Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] })
    }

    #[tokio::test]
    async fn disabled_config_makes_no_request() {
        let store = ConfigStore::default();
        let transport = MockTransport::new(vec![MockReply::Envelope(chat_envelope("hi"))]);
        let session = Session::new(&store, &transport, "sys");

        let err = session.ask(&Conversation::single("hello")).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidConfig(_)));
        assert_eq!(transport.request_count(), 0);
        assert_eq!(store.persisted().usage.total, 0);
    }

    #[tokio::test]
    async fn enabled_without_key_is_invalid_config() {
        let store = ConfigStore::default();
        store
            .update(ConfigUpdate {
                enabled: Some(true),
                ..ConfigUpdate::default()
            })
            .unwrap();
        let transport = MockTransport::new(vec![]);
        let err = Session::new(&store, &transport, "")
            .ask(&Conversation::single("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidConfig(msg) if msg.contains("API key")));
    }

    #[tokio::test]
    async fn non_streaming_ask_records_one_call() {
        let store = usable_store("deepseek");
        let transport = MockTransport::new(vec![MockReply::Envelope(chat_envelope("Hello!"))]);
        let session = Session::new(&store, &transport, "Be brief.");

        let text = session.ask(&Conversation::single("hi")).await.unwrap();
        assert_eq!(text, "Hello!");
        assert_eq!(store.persisted().usage.total, 1);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].streaming);
        assert_eq!(requests[0].body["messages"][0]["content"], "Be brief.");
    }

    #[tokio::test]
    async fn streaming_delivers_fragments_in_order() {
        let store = usable_store("deepseek");
        let body = sse_body(&[
            json!({ "choices": [{ "delta": { "role": "assistant" } }] }),
            json!({ "choices": [{ "delta": { "content": "Hel" } }] }),
            json!({ "choices": [{ "delta": { "content": "lo" } }] }),
            json!({ "choices": [{ "delta": { "content": "!" } }] }),
        ]);
        let transport = MockTransport::new(vec![MockReply::Sse(vec![body])]);
        let session = Session::new(&store, &transport, "");

        let mut seen: Vec<(String, String)> = Vec::new();
        let text = session
            .ask_streaming(&Conversation::single("hi"), |fragment| {
                seen.push((fragment.delta.to_string(), fragment.text.to_string()));
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(text, "Hello!");
        assert_eq!(
            seen,
            vec![
                ("Hel".to_string(), "Hel".to_string()),
                ("lo".to_string(), "Hello".to_string()),
                ("!".to_string(), "Hello!".to_string()),
            ]
        );
        assert!(transport.requests()[0].streaming);
        assert_eq!(store.persisted().usage.total, 1);
    }

    #[tokio::test]
    async fn malformed_frame_does_not_change_result() {
        let store = usable_store("deepseek");
        let good = sse_body(&[
            json!({ "choices": [{ "delta": { "content": "A" } }] }),
            json!({ "choices": [{ "delta": { "content": "B" } }] }),
        ]);
        let with_garbage = good.replacen("\n\n", "\n\ndata: {broken\n\n", 1);
        let transport = MockTransport::new(vec![
            MockReply::Sse(vec![good]),
            MockReply::Sse(vec![with_garbage]),
        ]);
        let session = Session::new(&store, &transport, "");

        let first = session
            .ask_streaming(&Conversation::single("x"), |_| Ok(()))
            .await
            .unwrap();
        let second = session
            .ask_streaming(&Conversation::single("x"), |_| Ok(()))
            .await
            .unwrap();
        assert_eq!(first, "AB");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn callback_error_aborts_without_recording() {
        let store = usable_store("deepseek");
        let body = sse_body(&[
            json!({ "choices": [{ "delta": { "content": "one" } }] }),
            json!({ "choices": [{ "delta": { "content": "two" } }] }),
        ]);
        let transport = MockTransport::new(vec![MockReply::Sse(vec![body])]);
        let session = Session::new(&store, &transport, "");

        let mut calls = 0;
        let err = session
            .ask_streaming(&Conversation::single("x"), |_| {
                calls += 1;
                anyhow::bail!("display closed")
            })
            .await
            .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(
            err,
            GatewayError::CallbackError(msg) if msg.contains("display closed")
        ));
        assert_eq!(store.persisted().usage.total, 0);
    }

    #[tokio::test]
    async fn non_streaming_provider_delivers_single_fragment() {
        let store = usable_store("google");
        let transport = MockTransport::new(vec![MockReply::Envelope(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Gemini says hi" }] } }]
        }))]);
        let session = Session::new(&store, &transport, "sys");

        let mut fragments = Vec::new();
        let text = session
            .ask_streaming(&Conversation::single("hi"), |fragment| {
                fragments.push(fragment.text.to_string());
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(text, "Gemini says hi");
        assert_eq!(fragments, vec!["Gemini says hi".to_string()]);
        assert!(!transport.requests()[0].streaming);
    }

    #[tokio::test]
    async fn provider_error_is_surfaced_without_recording() {
        let store = usable_store("openai");
        let transport = MockTransport::new(vec![MockReply::Error(GatewayError::ProviderError {
            status: 401,
            message: "Invalid API key".to_string(),
        })]);
        let err = Session::new(&store, &transport, "")
            .ask(&Conversation::single("hi"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "AI provider request failed (HTTP 401): Invalid API key"
        );
        assert_eq!(store.persisted().usage.total, 0);
    }

    #[tokio::test]
    async fn stream_error_discards_partial_text() {
        let store = usable_store("deepseek");
        let transport = MockTransport::new(vec![MockReply::SseThenError(
            vec![sse_body(&[json!({ "choices": [{ "delta": { "content": "partial" } }] })])
                .replace("data: [DONE]\n\n", "")],
            "connection reset".to_string(),
        )]);
        let err = Session::new(&store, &transport, "")
            .ask_streaming(&Conversation::single("x"), |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::StreamDecodeError(_)));
        assert_eq!(store.persisted().usage.total, 0);
    }

    #[tokio::test]
    async fn error_event_mid_stream_fails_the_call() {
        let store = usable_store("anthropic");
        let body = sse_body(&[
            json!({ "type": "message_start", "message": { "id": "msg_1" } }),
            json!({
                "type": "content_block_delta",
                "index": 0,
                "delta": { "type": "text_delta", "text": "Spend " }
            }),
            json!({
                "type": "error",
                "error": { "type": "overloaded_error", "message": "Overloaded" }
            }),
        ]);
        let transport = MockTransport::new(vec![MockReply::Sse(vec![body])]);

        let mut seen = String::new();
        let err = Session::new(&store, &transport, "")
            .ask_streaming(&Conversation::single("x"), |fragment| {
                seen.push_str(fragment.delta);
                Ok(())
            })
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::ProviderError {
                status: 200,
                message: "Overloaded".to_string()
            }
        );
        assert_eq!(seen, "Spend ");
        assert_eq!(store.persisted().usage.total, 0);
    }

    #[tokio::test]
    async fn chat_completions_error_frame_fails_the_call() {
        let store = usable_store("deepseek");
        let body = sse_body(&[
            json!({ "choices": [{ "delta": { "content": "Half" } }] }),
            json!({ "error": { "message": "Rate limit reached", "type": "requests" } }),
        ]);
        let transport = MockTransport::new(vec![MockReply::Sse(vec![body])]);

        // The mock streams even though the ask did not request it.
        let err = Session::new(&store, &transport, "")
            .ask(&Conversation::single("x"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::ProviderError {
                status: 200,
                message: "Rate limit reached".to_string()
            }
        );
        assert_eq!(store.persisted().usage.total, 0);
    }

    #[tokio::test]
    async fn fragments_concatenate_to_non_streamed_answer() {
        let store = usable_store("anthropic");
        let stream = sse_body(&[
            json!({ "type": "message_start", "message": { "id": "m" } }),
            json!({
                "type": "content_block_delta",
                "delta": { "type": "text_delta", "text": "Spend " }
            }),
            json!({
                "type": "content_block_delta",
                "delta": { "type": "text_delta", "text": "less." }
            }),
            json!({ "type": "message_stop" }),
        ]);
        let transport = MockTransport::new(vec![
            MockReply::Sse(vec![stream]),
            MockReply::Envelope(json!({ "content": [{ "type": "text", "text": "Spend less." }] })),
        ]);
        let session = Session::new(&store, &transport, "");
        let conversation = Conversation::from(vec![Message::user("advice?")]);

        let mut deltas = String::new();
        let mut last_text = String::new();
        let streamed = session
            .ask_streaming(&conversation, |fragment| {
                deltas.push_str(fragment.delta);
                last_text = fragment.text.to_string();
                Ok(())
            })
            .await
            .unwrap();
        let whole = session.ask(&conversation).await.unwrap();

        assert_eq!(deltas, streamed);
        assert_eq!(last_text, streamed);
        assert_eq!(streamed, whole);
    }

    #[tokio::test]
    async fn accumulate_skips_empty_deltas() {
        let deltas: DeltaStream = Box::pin(futures::stream::iter(vec![
            Ok("a".to_string()),
            Ok(String::new()),
            Ok("b".to_string()),
        ]));
        let mut count = 0;
        let callback: &mut FragmentCallback<'_> = &mut |_: &StreamFragment<'_>| {
            count += 1;
            Ok(())
        };
        let text = accumulate(deltas, Some(callback)).await.unwrap();
        assert_eq!(text, "ab");
        assert_eq!(count, 2);
    }
}
