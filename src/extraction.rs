//! Structured transaction extraction.
//!
//! Asks the model for a JSON payload of transactions, locates it inside the
//! free-form answer, and normalizes each element into a
//! [`TransactionCandidate`].

pub mod candidate;
pub mod category;
pub mod payload;
pub mod pipeline;
pub mod prompts;

pub use candidate::{TransactionCandidate, DEFAULT_CONFIDENCE};
pub use category::{map_category, OTHER_CATEGORY};
pub use pipeline::{candidates_from_answer, extract_transactions};
