//! Image recognition routing.
//!
//! A vision-capable primary provider receives the image through the normal
//! session. Otherwise the image goes to the separately configured vision
//! provider as a single non-streamed turn.

use tracing::{debug, info};

use super::error::{GatewayError, Result};
use super::format;
use super::message::{Conversation, ImageData, Message};
use super::normalize;
use super::provider;
use super::session::{self, Session};
use super::transport::{TextResult, Transport};
use crate::config::{ConfigStore, GatewayConfig, VisionConfig};

/// Where an image-bearing request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionRoute {
    /// The active provider handles the image itself.
    Primary,
    /// The dedicated vision provider handles the image.
    Dedicated,
}

/// Decides the route for an image request.
pub fn plan(primary: &GatewayConfig, vision: &VisionConfig) -> Result<VisionRoute> {
    if provider::profile(&primary.provider)?.supports_vision {
        return Ok(VisionRoute::Primary);
    }
    if !vision.enabled {
        return Err(GatewayError::VisionNotConfigured);
    }
    Ok(VisionRoute::Dedicated)
}

/// Sends an image and instruction to the routed provider and returns its text.
pub async fn route_image(
    store: &ConfigStore,
    transport: &dyn Transport,
    image: &ImageData,
    prompt: &str,
) -> Result<String> {
    let primary = store.load();
    let vision = store.vision();
    let route = plan(&primary, &vision)?;
    debug!(
        route = ?route,
        primary = %primary.provider,
        vision = %vision.provider,
        "Routing image request"
    );

    match route {
        VisionRoute::Primary => {
            let conversation =
                Conversation::from(vec![Message::user(prompt).with_image(image.clone())]);
            Session::new(store, transport, "").ask(&conversation).await
        }
        VisionRoute::Dedicated => recognize_with(store, transport, &vision, image, prompt).await,
    }
}

async fn recognize_with(
    store: &ConfigStore,
    transport: &dyn Transport,
    vision: &VisionConfig,
    image: &ImageData,
    prompt: &str,
) -> Result<String> {
    let profile = provider::profile(&vision.provider)?;
    let request = format::format_vision(profile, vision, image, prompt)?;

    let text = match transport.send(&request).await? {
        TextResult::Complete(envelope) => normalize::extract(profile, &envelope)?,
        TextResult::Stream(frames) => {
            session::accumulate(session::deltas(profile, frames), None).await?
        }
    };

    store.record_call();
    info!(
        provider = profile.id,
        model = %vision.model,
        response_len = text.len(),
        "Image recognized"
    );
    Ok(text)
}
