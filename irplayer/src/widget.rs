//! Widget bridge: the save-state contract of the home screen widget
//!
//! The widget lives in another process and only reads what we save. Saves
//! run on a background writer so a slow or missing bridge never stalls the
//! service; the writer always persists the most recent payload and drops
//! intermediate ones it did not get to.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

/// Payload saved for the widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetPayload {
    pub title: String,
    pub artist: String,
    pub image_url: Option<String>,
    pub is_playing: bool,
}

/// Destination of widget saves
#[async_trait]
pub trait WidgetBridge: Send + Sync + 'static {
    async fn save(&self, payload: &WidgetPayload) -> Result<()>;
}

// ============================================================================
// FileWidgetBridge
// ============================================================================

/// Saves the payload as a JSON file
///
/// The file is written next to its final location then renamed, so a reader
/// never sees a partial document.
#[derive(Debug, Clone)]
pub struct FileWidgetBridge {
    path: PathBuf,
}

impl FileWidgetBridge {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back the last saved payload
    pub async fn load(&self) -> Result<Option<WidgetPayload>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl WidgetBridge for FileWidgetBridge {
    async fn save(&self, payload: &WidgetPayload) -> Result<()> {
        let json = serde_json::to_vec_pretty(payload)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// ============================================================================
// Background writer
// ============================================================================

/// Hands payloads to a bridge from a background task
///
/// The task ends once the writer is dropped and the save in progress, if
/// any, has completed.
#[derive(Debug)]
pub struct WidgetWriter {
    latest: watch::Sender<Option<WidgetPayload>>,
}

impl WidgetWriter {
    /// Spawn the writer task; must be called from within a tokio runtime
    pub fn spawn(bridge: Arc<dyn WidgetBridge>) -> Self {
        let (latest, mut rx) = watch::channel(None::<WidgetPayload>);

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let payload = rx.borrow_and_update().clone();
                let Some(payload) = payload else { continue };
                if let Err(e) = bridge.save(&payload).await {
                    tracing::warn!("Widget update failed: {}", e);
                }
            }
        });

        Self { latest }
    }

    /// Queue a payload, replacing any not yet written
    pub fn submit(&self, payload: WidgetPayload) {
        self.latest.send_replace(Some(payload));
    }
}
