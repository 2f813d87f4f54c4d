//! Provider-agnostic conversation messages.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::error::{GatewayError, Result};

/// Speaker of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user.
    User,
    /// Model answer.
    Assistant,
    /// Instruction text.
    System,
}

impl Role {
    /// Returns the wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// Base64 image attached to a message.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    /// MIME type, e.g. `image/jpeg`.
    pub media_type: String,
    /// Base64 payload without any data-URI prefix.
    pub base64: String,
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("media_type", &self.media_type)
            .field("base64_len", &self.base64.len())
            .finish()
    }
}

impl ImageData {
    /// Default media type when the caller does not name one.
    pub const DEFAULT_MEDIA_TYPE: &'static str = "image/jpeg";

    /// Parses a base64 payload, accepting an optional `data:<type>;base64,` prefix.
    ///
    /// The payload is decoded once to reject malformed input before it is
    /// shipped to a provider.
    pub fn from_base64(payload: &str) -> Result<Self> {
        let payload = payload.trim();
        let (media_type, data) = match payload.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest.split_once(',').ok_or_else(|| {
                    GatewayError::InvalidInput("data URI is missing its payload".to_string())
                })?;
                let media_type = header
                    .strip_suffix(";base64")
                    .filter(|t| !t.is_empty())
                    .unwrap_or(Self::DEFAULT_MEDIA_TYPE);
                (media_type.to_string(), data)
            }
            None => (Self::DEFAULT_MEDIA_TYPE.to_string(), payload),
        };

        if data.is_empty() {
            return Err(GatewayError::InvalidInput("image payload is empty".to_string()));
        }
        STANDARD
            .decode(data)
            .map_err(|e| GatewayError::InvalidInput(format!("image is not valid base64: {e}")))?;

        Ok(Self {
            media_type,
            base64: data.to_string(),
        })
    }

    /// Encodes raw image bytes.
    pub fn from_bytes(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            base64: STANDARD.encode(bytes),
        }
    }

    /// Returns the payload as a `data:` URI.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.base64)
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Speaker.
    pub role: Role,
    /// Text content.
    pub content: String,
    /// Images sent alongside the text (user turns only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageData>,
}

impl Message {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: Vec::new(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            images: Vec::new(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            images: Vec::new(),
        }
    }

    /// Attaches an image to the message.
    #[must_use]
    pub fn with_image(mut self, image: ImageData) -> Self {
        self.images.push(image);
        self
    }
}

/// Ordered, append-only sequence of messages supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a conversation holding a single user message.
    pub fn single(content: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.push(Message::user(content));
        conversation
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Returns the messages in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the most recent user message, if any.
    pub fn latest_user(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// Returns true when the conversation has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
