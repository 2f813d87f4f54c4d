//! Finance assistant facade.
//!
//! Entry point for the host application: asks, chats, analyses ledgers,
//! recognizes receipts and extracts transactions over one shared
//! configuration store and transport.

pub mod canned;
pub mod prompts;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{AiSettings, ConfigStore, ConfigUpdate, UsageCounters};
use crate::extraction::{self, prompts::RECEIPT_OCR_PROMPT, TransactionCandidate};
use crate::gateway::session::{self, FragmentCallback};
use crate::gateway::simulated::{self, DEFAULT_CHAR_DELAY};
use crate::gateway::{
    vision, Conversation, GatewayError, HttpTransport, ImageData, Result, Session, StreamFragment,
    Transport,
};
use crate::ledger::{Category, FinancialSnapshot};

use prompts::{
    analysis_prompt, question_prompt, snapshot_context, ADVISOR_SYSTEM_PROMPT,
    CONNECTION_TEST_PROMPT,
};

/// AI features of the finance tracker.
pub struct FinanceAssistant {
    store: Arc<ConfigStore>,
    transport: Arc<dyn Transport>,
    char_delay: Duration,
}

impl FinanceAssistant {
    /// Creates an assistant over a store and transport.
    pub fn new(store: Arc<ConfigStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            store,
            transport,
            char_delay: DEFAULT_CHAR_DELAY,
        }
    }

    /// Creates an assistant using [`HttpTransport`] with the default timeout.
    pub fn with_http(store: Arc<ConfigStore>) -> Result<Self> {
        Ok(Self::new(store, Arc::new(HttpTransport::new()?)))
    }

    /// Sets the pause between characters of canned replies.
    #[must_use]
    pub fn with_char_delay(mut self, delay: Duration) -> Self {
        self.char_delay = delay;
        self
    }

    /// Shared configuration store.
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Returns true when the active configuration is usable.
    pub fn is_configured(&self) -> bool {
        self.store.load().is_usable()
    }

    fn session(&self) -> Session<'_> {
        Session::new(&self.store, self.transport.as_ref(), ADVISOR_SYSTEM_PROMPT)
    }

    /// Asks a conversation and returns the final answer.
    pub async fn ask(&self, conversation: &Conversation) -> Result<String> {
        self.session().ask(conversation).await
    }

    /// Asks a conversation, delivering fragments as they arrive.
    pub async fn ask_streaming<F>(
        &self,
        conversation: &Conversation,
        on_fragment: F,
    ) -> Result<String>
    where
        F: FnMut(&StreamFragment<'_>) -> anyhow::Result<()> + Send,
    {
        self.session().ask_streaming(conversation, on_fragment).await
    }

    /// Asks a single question, optionally prefixed with financial context.
    pub async fn ask_question(&self, question: &str, context: Option<&str>) -> Result<String> {
        let prompt = question_prompt(question, context);
        self.ask(&Conversation::single(prompt)).await
    }

    /// Asks for an analysis of a financial snapshot.
    pub async fn analyze_financial_data(&self, snapshot: &FinancialSnapshot) -> Result<String> {
        debug!(
            transactions = snapshot.transaction_count,
            budgets = snapshot.budgets.len(),
            "Requesting financial analysis"
        );
        self.ask(&Conversation::single(analysis_prompt(snapshot))).await
    }

    /// Chats with the assistant.
    ///
    /// Uses the configured provider when usable. Otherwise replays a canned
    /// reply through the same fragment contract; canned replies are not
    /// counted as calls.
    pub async fn chat<F>(
        &self,
        question: &str,
        snapshot: Option<&FinancialSnapshot>,
        mut on_fragment: F,
    ) -> Result<String>
    where
        F: FnMut(&StreamFragment<'_>) -> anyhow::Result<()> + Send,
    {
        if self.is_configured() {
            let context = snapshot.map(snapshot_context);
            let prompt = question_prompt(question, context.as_deref());
            return self.ask_streaming(&Conversation::single(prompt), on_fragment).await;
        }

        let reply = canned::reply(question);
        info!(reply_len = reply.len(), "AI not configured, replaying canned reply");
        let callback: &mut FragmentCallback<'_> = &mut on_fragment;
        let deltas = simulated::char_stream(reply, self.char_delay);
        session::accumulate(deltas, Some(callback)).await
    }

    /// Recognizes the text in a base64 image (an optional `data:` prefix is
    /// accepted).
    pub async fn recognize_image(
        &self,
        base64_image: &str,
        prompt: Option<&str>,
    ) -> Result<String> {
        let image = ImageData::from_base64(base64_image)?;
        vision::route_image(
            &self.store,
            self.transport.as_ref(),
            &image,
            prompt.unwrap_or(RECEIPT_OCR_PROMPT),
        )
        .await
    }

    /// Extracts transaction candidates from free text.
    pub async fn extract_transactions(
        &self,
        text: &str,
        categories: &[Category],
    ) -> Result<Vec<TransactionCandidate>> {
        extraction::extract_transactions(&self.store, self.transport.as_ref(), text, categories)
            .await
    }

    /// Recognizes a receipt image and extracts its transactions.
    ///
    /// A receipt without recognizable text yields an empty list.
    pub async fn import_receipt(
        &self,
        base64_image: &str,
        categories: &[Category],
    ) -> Result<Vec<TransactionCandidate>> {
        let text = self.recognize_image(base64_image, None).await?;
        if text.trim().is_empty() {
            info!("Receipt contained no recognizable text");
            return Ok(Vec::new());
        }
        self.extract_transactions(&text, categories).await
    }

    /// Verifies the configured provider answers.
    pub async fn test_connection(&self) -> Result<()> {
        if !self.store.load().has_api_key() {
            return Err(GatewayError::InvalidConfig("API key is not set".to_string()));
        }
        let answer = self.ask_question(CONNECTION_TEST_PROMPT, None).await?;
        info!(answer_len = answer.len(), "Connection test succeeded");
        Ok(())
    }

    /// Applies a partial settings update and returns the redacted result.
    pub fn update_config(&self, update: ConfigUpdate) -> Result<AiSettings> {
        self.store.update(update).map(|settings| settings.redacted())
    }

    /// Current settings with credentials redacted.
    pub fn settings(&self) -> AiSettings {
        self.store.settings().redacted()
    }

    /// Call counters as seen from the current month.
    pub fn usage_stats(&self) -> UsageCounters {
        self.store.stats()
    }
}
