//! Photorealistic render through an external image-generation service
//!
//! The service itself is opaque: it takes a PNG of the composited photo and
//! a text prompt, and answers with either an image or text. The credential
//! it needs is an injected capability, never process-wide state.

use base64::Engine;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Failures reported to the caller; none of them touch quad or sizing state
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("no API key configured for the render service")]
    MissingCredential,

    #[error("invalid image payload: {0}")]
    InvalidImage(String),

    #[error("render service failed: {0}")]
    Service(String),
}

/// What gets sent to the service
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub image_png: Vec<u8>,
    pub prompt: String,
}

/// What the service answered
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Image { mime_type: String, data: Vec<u8> },
    Text(String),
}

/// JSON shape of a [`RenderOutcome`]
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RenderResponse {
    Image { data_url: String },
    Text { text: String },
}

impl From<RenderOutcome> for RenderResponse {
    fn from(outcome: RenderOutcome) -> Self {
        match outcome {
            RenderOutcome::Image { mime_type, data } => RenderResponse::Image {
                data_url: format!(
                    "data:{};base64,{}",
                    mime_type,
                    base64::engine::general_purpose::STANDARD.encode(data)
                ),
            },
            RenderOutcome::Text(text) => RenderResponse::Text { text },
        }
    }
}

/// An image-generation backend
pub trait RenderService: Send + Sync {
    fn render<'a>(
        &'a self,
        api_key: &'a str,
        request: RenderRequest,
    ) -> BoxFuture<'a, Result<RenderOutcome, RenderError>>;
}

/// Where the service credential lives
pub trait CredentialStore: Send + Sync {
    fn api_key(&self) -> Option<String>;
    fn set_api_key(&self, key: String);
}

/// Credential held in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    key: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: RwLock::new(key.filter(|k| !k.trim().is_empty())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn api_key(&self) -> Option<String> {
        self.key.read().clone()
    }

    fn set_api_key(&self, key: String) {
        let key = key.trim().to_string();
        *self.key.write() = if key.is_empty() { None } else { Some(key) };
    }
}

/// Instructions sent along with the composited photo
pub fn build_prompt(screen_on: bool, pitch_mm: f64) -> String {
    let status = if screen_on {
        "displaying vibrant advertising content"
    } else {
        "powered off (solid black)"
    };

    format!(
        "TASK: Enhance this architectural photograph by integrating a professional \
direct-view LED screen installation.

LOCATION CONSTRAINT (highest priority):
- The dark rectangular area in the image is the LED screen placeholder
- Place the LED screen only inside that marked area and fit it exactly to its boundaries
- Do not add LED screens to any other building, wall or surface

COMPOSITION RULES:
1. Keep every object, person and architectural element where it is
2. Keep the original perspective and camera angle
3. Only change the marked screen area, reflections on glass, color grading and image quality

LED SCREEN:
- Direct-view LED display with a matte, non-reflective surface
- High brightness for outdoor visibility
- Visible pixel pitch texture (P{pitch})
- Seamless modular panels without bezels
- Screen status: {status}

ENHANCEMENTS:
- Realistic reflections of the screen on nearby glass
- Professional color grading and sharpness
- Lighting adjusted to the screen brightness

Output: a photorealistic photograph with the LED screen only in the marked area.",
        pitch = pitch_mm,
        status = status,
    )
}

/// Decode a PNG sent as base64, with or without a `data:` URL prefix
pub fn decode_image(payload: &str) -> Result<Vec<u8>, RenderError> {
    let data = match payload.split_once(',') {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| RenderError::InvalidImage(e.to_string()))?;
    if bytes.is_empty() {
        return Err(RenderError::InvalidImage("empty image".to_string()));
    }
    Ok(bytes)
}

/// Pairs a render backend with the credential it needs
#[derive(Clone)]
pub struct RenderGateway {
    service: Arc<dyn RenderService>,
    credentials: Arc<dyn CredentialStore>,
}

impl RenderGateway {
    pub fn new(service: Arc<dyn RenderService>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { service, credentials }
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub async fn render(
        &self,
        image_png: Vec<u8>,
        screen_on: bool,
        pitch_mm: f64,
    ) -> Result<RenderOutcome, RenderError> {
        let api_key = self
            .credentials
            .api_key()
            .ok_or(RenderError::MissingCredential)?;

        let request = RenderRequest {
            image_png,
            prompt: build_prompt(screen_on, pitch_mm),
        };

        info!("Requesting render ({} bytes)", request.image_png.len());
        let result = self.service.render(&api_key, request).await;
        match &result {
            Ok(RenderOutcome::Image { data, .. }) => {
                info!("Render returned an image ({} bytes)", data.len())
            }
            Ok(RenderOutcome::Text(_)) => info!("Render returned text only"),
            Err(e) => warn!("Render failed: {}", e),
        }
        result
    }
}
