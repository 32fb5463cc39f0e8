//! Local media capture
//!
//! There is no camera behind this binary, so capture produces a synthetic
//! VP8 track fed by a sample pump task. The stream handle fulfils the same
//! contract a device-backed capture would: tracks to attach to a peer
//! connection, and an idempotent stop that ends the pump.

use crate::application::ports::LocalMedia;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};
use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const FRAME_INTERVAL: Duration = Duration::from_millis(33);
const BLANK_FRAME_LEN: usize = 100;

/// A captured local stream: its tracks plus a kill switch for the pump
pub struct MediaStream {
    tracks: Vec<Arc<TrackLocalStaticSample>>,
    stopped: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl MediaStream {
    pub fn tracks(&self) -> &[Arc<TrackLocalStaticSample>] {
        &self.tracks
    }
}

impl LocalMedia for MediaStream {
    fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("stopping captured tracks");
        let _ = self.shutdown.send(true);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl LocalMedia for Arc<MediaStream> {
    fn stop(&self) {
        MediaStream::stop(self)
    }

    fn is_stopped(&self) -> bool {
        MediaStream::is_stopped(self)
    }
}

/// Synthetic stand-in for `getUserMedia`
pub struct SyntheticCapture;

impl SyntheticCapture {
    /// Create a VP8 video track and start pumping blank frames into it
    pub fn capture() -> Arc<MediaStream> {
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_string(),
                ..Default::default()
            },
            "video".to_string(),
            "peercast-capture".to_string(),
        ));

        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let pump_track = track.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(FRAME_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let sample = Sample {
                            data: Bytes::from(vec![0u8; BLANK_FRAME_LEN]),
                            duration: FRAME_INTERVAL,
                            ..Default::default()
                        };
                        // Before the track is attached to a connected peer,
                        // writes are dropped by the track itself
                        if pump_track.write_sample(&sample).await.is_err() {
                            debug!("video track closed, stopping frame pump");
                            break;
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            debug!("frame pump stopped");
                            break;
                        }
                    }
                }
            }
        });

        Arc::new(MediaStream {
            tracks: vec![track],
            stopped: AtomicBool::new(false),
            shutdown,
        })
    }
}
