//! Peer connection adapter over the `webrtc` crate
//!
//! `RtcPeerFactory` builds configured `RTCPeerConnection`s with their
//! observers bridged onto the application's event channel; `RtcPeer` exposes
//! the negotiation surface the controllers drive.

use crate::application::ports::{MediaPeer, PeerEvent, PeerFactory, PeerStatus};
use crate::domain::session::NegotiationRole;
use crate::domain::shared::error::SessionError;
use crate::domain::shared::result::Result;
use crate::domain::signaling::{CandidateInit, SdpType, SessionDescription};
use crate::infrastructure::media::MediaStream;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::TrackLocal;

fn rtc_err(e: webrtc::Error) -> SessionError {
    SessionError::Negotiation(e.to_string())
}

fn status_of(state: RTCPeerConnectionState) -> PeerStatus {
    match state {
        RTCPeerConnectionState::New => PeerStatus::New,
        RTCPeerConnectionState::Connecting => PeerStatus::Connecting,
        RTCPeerConnectionState::Connected => PeerStatus::Connected,
        RTCPeerConnectionState::Disconnected => PeerStatus::Disconnected,
        RTCPeerConnectionState::Failed => PeerStatus::Failed,
        RTCPeerConnectionState::Closed => PeerStatus::Closed,
        RTCPeerConnectionState::Unspecified => PeerStatus::New,
    }
}

/// Builds peer connections against the configured ICE servers
///
/// When a captured stream is attached, its tracks are added to every peer
/// this factory creates; an offerer without a stream still negotiates a
/// receive path for remote video.
pub struct RtcPeerFactory {
    stun_servers: Vec<String>,
    media: Option<Arc<MediaStream>>,
}

impl RtcPeerFactory {
    pub fn new(stun_servers: Vec<String>) -> Self {
        Self {
            stun_servers,
            media: None,
        }
    }

    pub fn with_media(mut self, media: Arc<MediaStream>) -> Self {
        self.media = Some(media);
        self
    }

    fn configuration(&self) -> RTCConfiguration {
        RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: self.stun_servers.clone(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl PeerFactory for RtcPeerFactory {
    async fn create_peer(
        &self,
        role: NegotiationRole,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Arc<dyn MediaPeer>> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| SessionError::Media(e.to_string()))?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(|e| SessionError::Media(e.to_string()))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let pc = Arc::new(
            api.new_peer_connection(self.configuration())
                .await
                .map_err(rtc_err)?,
        );

        let candidate_events = events.clone();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let events = candidate_events.clone();
            Box::pin(async move {
                // None marks the end of gathering; only real candidates trickle
                let Some(candidate) = candidate else {
                    return;
                };
                match candidate.to_json() {
                    Ok(json) => {
                        let init = CandidateInit {
                            candidate: json.candidate,
                            sdp_mid: json.sdp_mid,
                            sdp_mline_index: json.sdp_mline_index,
                            username_fragment: json.username_fragment,
                        };
                        if events.send(PeerEvent::Candidate(init)).is_err() {
                            debug!("event channel closed, candidate dropped");
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to serialize local candidate"),
                }
            })
        }));

        let track_events = events.clone();
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let events = track_events.clone();
            Box::pin(async move {
                let _ = events.send(PeerEvent::Track {
                    id: track.id(),
                    kind: track.kind().to_string(),
                });
            })
        }));

        let state_events = events;
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let events = state_events.clone();
            Box::pin(async move {
                let _ = events.send(PeerEvent::StateChanged(status_of(state)));
            })
        }));

        match &self.media {
            Some(media) => {
                for track in media.tracks() {
                    let sender = pc
                        .add_track(track.clone() as Arc<dyn TrackLocal + Send + Sync>)
                        .await
                        .map_err(rtc_err)?;
                    // RTCP must be read off the sender or its buffers fill up
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 1500];
                        while let Ok((_, _)) = sender.read(&mut buf).await {}
                    });
                }
            }
            None => {
                if role == NegotiationRole::Offerer {
                    // No local tracks; the offer still has to carry a video
                    // section so the remote side can send
                    pc.add_transceiver_from_kind(RTPCodecType::Video, None)
                        .await
                        .map_err(rtc_err)?;
                }
            }
        }

        let peer: Arc<dyn MediaPeer> = Arc::new(RtcPeer { pc });
        Ok(peer)
    }
}

/// One live `RTCPeerConnection`
pub struct RtcPeer {
    pc: Arc<RTCPeerConnection>,
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription> {
    match desc.kind {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp).map_err(rtc_err),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp).map_err(rtc_err),
    }
}

#[async_trait::async_trait]
impl MediaPeer for RtcPeer {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.pc.create_offer(None).await.map_err(rtc_err)?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.pc.create_answer(None).await.map_err(rtc_err)?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.pc
            .set_local_description(to_rtc(desc)?)
            .await
            .map_err(rtc_err)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.pc
            .set_remote_description(to_rtc(desc)?)
            .await
            .map_err(rtc_err)
    }

    async fn add_ice_candidate(&self, candidate: CandidateInit) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment,
        };
        self.pc.add_ice_candidate(init).await.map_err(rtc_err)
    }

    async fn has_remote_description(&self) -> bool {
        self.pc.remote_description().await.is_some()
    }

    async fn close(&self) -> Result<()> {
        self.pc.close().await.map_err(rtc_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_mapping_covers_terminal_states() {
        assert_eq!(status_of(RTCPeerConnectionState::Connected), PeerStatus::Connected);
        assert_eq!(status_of(RTCPeerConnectionState::Failed), PeerStatus::Failed);
        assert_eq!(status_of(RTCPeerConnectionState::Closed), PeerStatus::Closed);
    }

    #[test]
    fn test_description_conversion_keeps_sdp_text() {
        let sdp = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";
        let rtc = to_rtc(SessionDescription::offer(sdp)).unwrap();
        assert_eq!(rtc.sdp, sdp);
    }
}
