//! Shared test utilities for the `gateway` module.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::error::{GatewayError, Result};
use super::format::FormattedRequest;
use super::stream::decode_frames;
use super::transport::{TextResult, Transport};

/// Scripted reply for [`MockTransport`].
pub(crate) enum MockReply {
    /// A complete JSON envelope.
    Envelope(Value),
    /// A streamed body delivered as the given chunks.
    Sse(Vec<String>),
    /// A streamed body whose read fails after the given chunks.
    SseThenError(Vec<String>, String),
    /// A transport-level failure.
    Error(GatewayError),
}

/// Transport with a pre-programmed queue of replies.
///
/// Replies are returned in FIFO order; an exhausted queue yields a
/// `NetworkError`. Every request is recorded for inspection.
#[derive(Clone)]
pub(crate) struct MockTransport {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<FormattedRequest>>>,
}

impl MockTransport {
    /// Creates a transport that returns the given replies in order.
    pub(crate) fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns every request sent so far.
    pub(crate) fn requests(&self) -> Vec<FormattedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Returns the number of requests sent.
    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Returns the number of unconsumed replies.
    pub(crate) fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    fn send<'a>(
        &'a self,
        request: &'a FormattedRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TextResult>> + Send + 'a>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(MockReply::Envelope(value)) => Ok(TextResult::Complete(value)),
                Some(MockReply::Sse(chunks)) => {
                    let chunks: Vec<std::result::Result<Vec<u8>, std::io::Error>> =
                        chunks.into_iter().map(|c| Ok(c.into_bytes())).collect();
                    Ok(TextResult::Stream(decode_frames(futures::stream::iter(chunks))))
                }
                Some(MockReply::SseThenError(chunks, error)) => {
                    let mut items: Vec<std::result::Result<Vec<u8>, std::io::Error>> =
                        chunks.into_iter().map(|c| Ok(c.into_bytes())).collect();
                    items.push(Err(std::io::Error::other(error)));
                    Ok(TextResult::Stream(decode_frames(futures::stream::iter(items))))
                }
                Some(MockReply::Error(e)) => Err(e),
                None => Err(GatewayError::NetworkError("no more mock replies".to_string())),
            }
        })
    }
}

/// Renders frames as an event-stream body terminated by `[DONE]`.
pub(crate) fn sse_body(frames: &[Value]) -> String {
    let mut body = String::new();
    for frame in frames {
        body.push_str("data: ");
        body.push_str(&frame.to_string());
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    body
}
