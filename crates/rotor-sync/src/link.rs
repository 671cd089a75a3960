//! Push-stream connection lifecycle.
//!
//! The lifecycle is a small pure state machine ([`LinkMachine`]) that maps
//! `(state, event)` to a new state plus a list of [`LinkEffect`]s. The
//! [`ConnectionManager`] task executes those effects against a
//! [`Connector`] and feeds frames and link signals into the session queue.
//! There is no give-up state: every close schedules exactly one reconnect.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::session::EngineEvent;

/// Delay between a close and the next connection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2_000);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("socket error: {0}")]
    Socket(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    HandshakeOk,
    TransportError(String),
    ServerClosed,
    ReconnectElapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEffect {
    Dial,
    ForceClose,
    AnnounceOpen,
    AnnounceClosed,
    ScheduleReconnect(Duration),
}

#[derive(Debug, Clone)]
pub struct LinkMachine {
    state: LinkState,
    reconnect_delay: Duration,
}

impl LinkMachine {
    /// A machine in `Connecting`, plus the effects needed to get going.
    pub fn start(reconnect_delay: Duration) -> (Self, Vec<LinkEffect>) {
        (
            Self {
                state: LinkState::Connecting,
                reconnect_delay,
            },
            vec![LinkEffect::Dial],
        )
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn step(&mut self, event: LinkEvent) -> Vec<LinkEffect> {
        use LinkEffect::*;

        let (next, effects) = match (self.state, event) {
            (LinkState::Connecting, LinkEvent::HandshakeOk) => (LinkState::Open, vec![AnnounceOpen]),
            // Errors force the socket shut so the close path runs exactly
            // once, whether or not the peer ever sends a close.
            (LinkState::Connecting | LinkState::Open, LinkEvent::TransportError(_)) => (
                LinkState::Closed,
                vec![
                    ForceClose,
                    AnnounceClosed,
                    ScheduleReconnect(self.reconnect_delay),
                ],
            ),
            (LinkState::Connecting | LinkState::Open, LinkEvent::ServerClosed) => (
                LinkState::Closed,
                vec![AnnounceClosed, ScheduleReconnect(self.reconnect_delay)],
            ),
            (LinkState::Closed, LinkEvent::ReconnectElapsed) => (LinkState::Connecting, vec![Dial]),
            // A reconnect is already pending, or the event is stale.
            (state, _) => (state, Vec::new()),
        };
        self.state = next;
        effects
    }
}

/// A frame received on the push stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    Text(String),
    Binary(Vec<u8>),
    Close(Option<String>),
}

pub type FrameStream = BoxStream<'static, Result<WireFrame, TransportError>>;

/// Opens push-stream connections. The returned stream ending is treated
/// as a server close.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<FrameStream, TransportError>;
}

/// WebSocket connector over `tokio-tungstenite`. No subprotocol and no
/// authentication; control frames are handled by tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<FrameStream, TransportError> {
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        let frames = ws_stream.filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => Some(Ok(WireFrame::Text(text))),
                Ok(Message::Binary(bytes)) => Some(Ok(WireFrame::Binary(bytes))),
                Ok(Message::Close(frame)) => {
                    Some(Ok(WireFrame::Close(frame.map(|f| f.reason.to_string()))))
                }
                Ok(_) => None,
                Err(err) => Some(Err(TransportError::Socket(err.to_string()))),
            }
        });
        Ok(frames.boxed())
    }
}

/// Owns the push-stream connection and keeps it alive forever.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    url: Url,
    reconnect_delay: Duration,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, url: Url) -> Self {
        Self {
            connector,
            url,
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Drive the connection until the session queue is dropped.
    pub async fn run(self, events: mpsc::UnboundedSender<EngineEvent>) {
        let (mut machine, mut effects) = LinkMachine::start(self.reconnect_delay);
        let mut stream: Option<FrameStream> = None;

        loop {
            let mut follow_up = None;
            for effect in effects.drain(..) {
                let delivered = match effect {
                    LinkEffect::Dial => {
                        info!(target: "rotor.link", url = %self.url, "connecting");
                        let delivered = events
                            .send(EngineEvent::Link(LinkState::Connecting))
                            .is_ok();
                        match self.connector.connect(&self.url).await {
                            Ok(opened) => {
                                stream = Some(opened);
                                follow_up = Some(LinkEvent::HandshakeOk);
                            }
                            Err(err) => {
                                warn!(target: "rotor.link", error = %err, "connection attempt failed");
                                follow_up = Some(LinkEvent::TransportError(err.to_string()));
                            }
                        }
                        delivered
                    }
                    LinkEffect::ForceClose => {
                        stream = None;
                        true
                    }
                    LinkEffect::AnnounceOpen => {
                        info!(target: "rotor.link", url = %self.url, "connected");
                        events.send(EngineEvent::Link(LinkState::Open)).is_ok()
                    }
                    LinkEffect::AnnounceClosed => {
                        stream = None;
                        info!(target: "rotor.link", "disconnected");
                        events.send(EngineEvent::Link(LinkState::Closed)).is_ok()
                    }
                    LinkEffect::ScheduleReconnect(delay) => {
                        debug!(
                            target: "rotor.link",
                            delay_ms = delay.as_millis() as u64,
                            "reconnect scheduled"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = events.closed() => return,
                        }
                        follow_up = Some(LinkEvent::ReconnectElapsed);
                        true
                    }
                };
                if !delivered {
                    debug!(target: "rotor.link", "session queue closed; stopping");
                    return;
                }
            }

            let event = match follow_up {
                Some(event) => event,
                None => match stream.as_mut() {
                    Some(frames) => {
                        let next = tokio::select! {
                            next = frames.next() => next,
                            _ = events.closed() => return,
                        };
                        match next {
                            Some(Ok(WireFrame::Close(reason))) => {
                                info!(target: "rotor.link", reason = ?reason, "server closed stream");
                                LinkEvent::ServerClosed
                            }
                            Some(Ok(frame)) => {
                                trace!(target: "rotor.link", "frame received");
                                if events.send(EngineEvent::Frame(frame)).is_err() {
                                    return;
                                }
                                continue;
                            }
                            Some(Err(err)) => {
                                warn!(target: "rotor.link", error = %err, "stream error");
                                LinkEvent::TransportError(err.to_string())
                            }
                            None => LinkEvent::ServerClosed,
                        }
                    }
                    None => {
                        // Open without a stream cannot happen; recover through
                        // the normal close path rather than spinning.
                        LinkEvent::ServerClosed
                    }
                },
            };
            effects = machine.step(event);
        }
    }
}
