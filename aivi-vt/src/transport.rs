//! Chat-transport seam
//!
//! The surrounding bot owns the chat transport; the pipeline only needs
//! two callbacks from it: fetch an attachment's bytes to a local path and
//! surface a "processing" indicator to the user. Both are fallible
//! external calls.

use std::path::Path;

use async_trait::async_trait;

/// An inbound voice attachment as delivered by the chat transport.
///
/// Declared duration/size/MIME come from the transport and may be
/// approximate; decoded values replace them during normalization.
#[derive(Debug, Clone)]
pub struct VoiceAttachment {
    /// Transport-unique identifier of the attachment
    pub file_id: String,
    /// Declared MIME type, if any
    pub mime_type: Option<String>,
    /// Declared duration in seconds, if any
    pub duration_seconds: Option<f64>,
    /// Declared size in bytes, if any
    pub size_bytes: Option<u64>,
}

/// Transport callbacks the pipeline invokes.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Fetch the attachment's bytes into `dest`.
    ///
    /// A partial file may remain on failure; the pipeline's cleanup
    /// removes it either way.
    async fn download_to(
        &self,
        attachment: &VoiceAttachment,
        dest: &Path,
    ) -> std::io::Result<()>;

    /// Show a "processing" indicator to the owning user.
    async fn notify_processing(&self, owner_id: i64) -> std::io::Result<()>;
}
