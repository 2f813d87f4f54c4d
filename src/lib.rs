//! # fintrack-ai
//!
//! AI provider gateway and transaction extraction for a personal finance
//! tracker.
//!
//! ## Features
//!
//! - One call contract over OpenAI-compatible, Anthropic and Gemini APIs
//! - Incremental delivery of streamed answers
//! - Receipt recognition routed to a vision-capable provider
//! - Extraction of confidence-scored transaction candidates
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fintrack_ai::config::ConfigManager;
//! use fintrack_ai::FinanceAssistant;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let store = Arc::new(ConfigManager::new().load_store()?);
//! let assistant = FinanceAssistant::with_http(store)?;
//! let answer = assistant.ask_question("每月应该存多少钱？", None).await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod assistant;
pub mod config;
pub mod extraction;
pub mod gateway;
pub mod ledger;
pub mod logging;

pub use crate::assistant::FinanceAssistant;
pub use crate::extraction::TransactionCandidate;
pub use crate::gateway::{GatewayError, Result};

/// The current version of fintrack-ai.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
