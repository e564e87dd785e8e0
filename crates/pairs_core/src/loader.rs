//! Per-card image loading. Every load runs as its own background task and
//! reports back through a channel, tagged with the slot and the generation it
//! was requested for.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{Generation, ImageReference, SlotIndex},
    error::LoadError,
};
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::{debug, warn};

/// RGBA pixels ready for display.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

pub fn decode_card_image(bytes: &[u8], max_dimension: u32) -> Result<DecodedImage, LoadError> {
    let dynamic = image::load_from_memory(bytes).map_err(|err| LoadError::Decode(err.to_string()))?;
    let bounded = if dynamic.width() > max_dimension || dynamic.height() > max_dimension {
        dynamic.thumbnail(max_dimension, max_dimension)
    } else {
        dynamic
    };
    let rgba = bounded.to_rgba8();
    Ok(DecodedImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, LoadError>;
}

pub struct HttpImageSource {
    http: Client,
}

impl HttpImageSource {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| LoadError::Network(err.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }
        let body = res
            .bytes()
            .await
            .map_err(|err| LoadError::Network(err.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Result of one background load, delivered to the session's sequential context.
#[derive(Debug, Clone)]
pub struct LoadCompletion {
    pub slot: SlotIndex,
    pub generation: Generation,
    pub result: Result<Arc<DecodedImage>, LoadError>,
}

#[derive(Clone)]
pub struct CardImageLoader {
    source: Arc<dyn ImageSource>,
    max_dimension: u32,
}

impl CardImageLoader {
    pub fn new(source: Arc<dyn ImageSource>, max_dimension: u32) -> Self {
        Self {
            source,
            max_dimension,
        }
    }

    pub async fn load(&self, reference: &ImageReference) -> Result<DecodedImage, LoadError> {
        let bytes = self.source.fetch_bytes(&reference.url).await?;
        let max_dimension = self.max_dimension;
        tokio::task::spawn_blocking(move || decode_card_image(&bytes, max_dimension))
            .await
            .map_err(|err| {
                if err.is_cancelled() {
                    LoadError::Cancelled
                } else {
                    LoadError::Decode(format!("decoder task failed: {err}"))
                }
            })?
    }

    /// Starts a load in the background. The completion is sent even on failure;
    /// if the receiver is gone the result is dropped.
    pub fn spawn_load(
        &self,
        slot: SlotIndex,
        generation: Generation,
        reference: ImageReference,
        completions: UnboundedSender<LoadCompletion>,
    ) -> JoinHandle<()> {
        let loader = self.clone();
        tokio::spawn(async move {
            let result = loader.load(&reference).await.map(Arc::new);
            if let Err(err) = &result {
                warn!(slot = slot.0, url = %reference.url, "card image load failed: {err}");
            }
            if completions
                .send(LoadCompletion {
                    slot,
                    generation,
                    result,
                })
                .is_err()
            {
                debug!(slot = slot.0, "session gone before image load completed");
            }
        })
    }
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
