//! AI provider gateway.
//!
//! Talks to several mutually incompatible language-model APIs through one
//! call contract: a [`Conversation`] goes in, plain text (optionally
//! delivered as incremental [`StreamFragment`]s) comes out.

pub mod error;
pub mod format;
pub mod message;
pub mod normalize;
pub mod provider;
pub mod session;
pub mod simulated;
pub mod stream;
pub mod transport;
pub mod vision;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{GatewayError, Result};
pub use format::{format, format_vision, FormattedRequest, MAX_TOKENS};
pub use message::{Conversation, ImageData, Message, Role};
pub use provider::{profile, providers, AuthScheme, ProviderProfile};
pub use session::{DeltaStream, FragmentCallback, Session, StreamFragment};
pub use stream::{decode_frames, FrameDecoder, FrameEvent, FrameStream};
pub use transport::{HttpTransport, TextResult, Transport, DEFAULT_REQUEST_TIMEOUT};
pub use vision::{route_image, VisionRoute};
