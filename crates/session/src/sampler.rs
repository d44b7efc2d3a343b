//! Adaptive video sampler.
//!
//! Forwards frames at `fps_speaking` while the participant is talking and
//! at `fps_silent` otherwise. The video toggle and the voice-activity flag
//! live in a shared [`VideoGate`]: the controller flips `enabled`, the
//! media pipeline flips `speaking`, and the sampler only reads both.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use roomwarden_core::media::{FrameSink, VideoFrame};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoSamplingPolicy {
    pub fps_speaking: f64,
    pub fps_silent: f64,
}

impl VideoSamplingPolicy {
    /// Minimum spacing between forwarded frames.
    pub fn interval(&self, speaking: bool) -> Duration {
        let fps = if speaking {
            self.fps_speaking
        } else {
            self.fps_silent
        };
        if fps > 0.0 {
            Duration::try_from_secs_f64(1.0 / fps).unwrap_or(Duration::MAX)
        } else {
            Duration::MAX
        }
    }
}

impl Default for VideoSamplingPolicy {
    fn default() -> Self {
        Self {
            fps_speaking: 1.0,
            fps_silent: 0.3,
        }
    }
}

/// Flags shared between the controller, the media pipeline and the sampler.
#[derive(Debug, Clone)]
pub struct VideoGate {
    enabled: Arc<AtomicBool>,
    speaking: Arc<AtomicBool>,
}

impl VideoGate {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
            speaking: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Returns the previous value.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::AcqRel)
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Acquire)
    }

    /// Latest voice-activity signal from the media pipeline.
    pub fn set_speaking(&self, speaking: bool) {
        self.speaking.store(speaking, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct AdaptiveVideoSampler {
    policy: VideoSamplingPolicy,
    gate: VideoGate,
    last_forwarded: Option<Instant>,
}

impl AdaptiveVideoSampler {
    pub fn new(policy: VideoSamplingPolicy, gate: VideoGate) -> Self {
        Self {
            policy,
            gate,
            last_forwarded: None,
        }
    }

    pub fn gate(&self) -> &VideoGate {
        &self.gate
    }

    /// Decide whether the frame available at `now` should be forwarded.
    ///
    /// Reads the activity flag fresh on every call, so a change applies to
    /// the next decision only. While video is disabled nothing is recorded.
    pub fn should_forward(&mut self, now: Instant) -> bool {
        if !self.gate.is_enabled() {
            return false;
        }

        let interval = self.policy.interval(self.gate.is_speaking());
        let due = match self.last_forwarded {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= interval,
        };
        if due {
            self.last_forwarded = Some(now);
        }
        due
    }
}

/// Feed frames through the sampler into `sink` until the stream ends or
/// `stop` resolves.
///
/// Returns how many frames were forwarded. A failing sink is logged and
/// the frame dropped.
pub async fn run_video_pump(
    mut sampler: AdaptiveVideoSampler,
    mut frames: mpsc::Receiver<VideoFrame>,
    sink: Arc<dyn FrameSink>,
    stop: impl Future<Output = ()>,
) -> usize {
    tokio::pin!(stop);
    let mut forwarded = 0;
    loop {
        let frame = tokio::select! {
            biased;

            () = &mut stop => {
                debug!(forwarded, "Video pump stopped");
                return forwarded;
            }
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        if !sampler.should_forward(Instant::now()) {
            continue;
        }
        let timestamp_us = frame.timestamp_us;
        match sink.forward(frame).await {
            Ok(()) => forwarded += 1,
            Err(e) => warn!(timestamp_us, error = %e, "Dropping video frame, sink failed"),
        }
    }
    debug!(forwarded, "Video stream ended");
    forwarded
}
