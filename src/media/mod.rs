//! Peer-to-peer media transport surface
//!
//! The avatar's audio and video arrive over a relay-negotiated peer
//! connection owned by an external media stack; this module defines the seam
//! the session drives it through.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

/// Relay server credentials for media negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceServer {
    /// Relay URLs
    pub urls: Vec<String>,

    /// Relay username
    pub username: String,

    /// Relay credential
    pub credential: String,
}

/// Negotiated media track kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Avatar voice audio
    Audio,
    /// Avatar video
    Video,
}

/// Peer connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Negotiation in progress
    Connecting,
    /// Media flowing
    Connected,
    /// Transport lost
    Disconnected,
    /// Negotiation failed
    Failed,
    /// Torn down
    Closed,
}

/// Event emitted by the media transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// A negotiated track started playing
    TrackOpened(TrackKind),

    /// Connection state changed
    StateChanged(ConnectionState),
}

/// Media transport collaborator
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Negotiate audio and video tracks (sendrecv) against the relay and
    /// start the avatar session
    ///
    /// # Errors
    ///
    /// Returns error if negotiation fails
    async fn connect(&self, ice: &IceServer) -> Result<mpsc::Receiver<MediaEvent>>;

    /// Current playback position of the remote video, if a track is live
    fn playback_position(&self) -> Option<Duration>;

    /// Tear down the peer connection
    async fn close(&self);
}
