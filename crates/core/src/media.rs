//! Media types shared between the frame source and the video sampler.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RoomError;

/// One decoded video frame. The pixel data is opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,

    /// Presentation timestamp in microseconds
    pub timestamp_us: u64,

    #[serde(default, skip_serializing)]
    pub data: Vec<u8>,
}

/// Where accepted frames go (the model's video input).
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn forward(&self, frame: VideoFrame) -> Result<(), RoomError>;
}
