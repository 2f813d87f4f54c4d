//! Character-by-character replay of a fixed answer.
//!
//! Produces the same [`DeltaStream`] a streamed provider response does, so
//! canned answers reach callers through the ordinary fragment contract.

use std::time::Duration;

use futures::StreamExt;

use super::session::DeltaStream;

/// Default pause between simulated characters.
pub const DEFAULT_CHAR_DELAY: Duration = Duration::from_millis(20);

/// Streams `text` one character at a time, pausing `delay` before each.
pub fn char_stream(text: &str, delay: Duration) -> DeltaStream {
    let chars: Vec<String> = text.chars().map(String::from).collect();
    Box::pin(futures::stream::iter(chars).then(move |c| async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(c)
    }))
}
