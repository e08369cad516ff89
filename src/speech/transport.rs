// WebSocket client for the streaming speech recognition service.
//
// One connection per recognition run. PCM16 frames flow out as binary
// messages; recognition results come back as JSON text messages. A
// connection that cannot be established within the configured timeout is a
// soft failure: the caller falls back to manual text entry and the rest of
// the session keeps running.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::event::{end_command, SpeechEvent};
use crate::transport::{StateCell, TransportState};

/// Speech recognition connection settings
#[derive(Debug, Clone)]
pub struct SpeechSettings {
    /// Recognition service WebSocket URL
    pub url: String,
    /// Handshake deadline; exceeding it degrades to manual text entry
    pub connect_timeout: Duration,
    /// Delay between the end-of-stream control frame and the close, so the
    /// control frame flushes
    pub end_grace: Duration,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8811/api/asr".to_string(),
            connect_timeout: Duration::from_secs(5),
            end_grace: Duration::from_millis(300),
        }
    }
}

enum Outbound {
    Frame(Vec<u8>),
    End,
    Close,
}

pub struct SpeechTransport {
    settings: SpeechSettings,
    state: StateCell,
    outbound: Mutex<Option<mpsc::Sender<Outbound>>>,
}

impl SpeechTransport {
    pub fn new(settings: SpeechSettings) -> Self {
        Self {
            settings,
            state: StateCell::new(),
            outbound: Mutex::new(None),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state.get()
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Open the recognition connection and return the event receiver.
    ///
    /// No-op (returns None) when already open. A handshake that does not
    /// complete within the timeout closes the attempt and returns an error;
    /// the caller treats this as a degraded mode, not a session failure.
    pub async fn start(&self) -> Result<Option<mpsc::Receiver<SpeechEvent>>> {
        if self.is_open() {
            debug!("Speech transport already open");
            return Ok(None);
        }

        self.state.set(TransportState::Connecting);
        info!("Connecting to speech service: {}", self.settings.url);

        let connect = connect_async(&self.settings.url);
        let (ws, _) = match timeout(self.settings.connect_timeout, connect).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                self.state.set(TransportState::Closed);
                return Err(e).context("Failed to connect to speech service");
            }
            Err(_) => {
                self.state.set(TransportState::Closed);
                anyhow::bail!(
                    "Speech service connection timed out after {:?}",
                    self.settings.connect_timeout
                );
            }
        };

        self.state.set(TransportState::Open);
        info!("Speech service connected");

        let (cmd_tx, mut cmd_rx) = mpsc::channel::<Outbound>(64);
        let (event_tx, event_rx) = mpsc::channel::<SpeechEvent>(64);
        *self.outbound.lock().await = Some(cmd_tx);

        let state = self.state.clone();
        tokio::spawn(async move {
            let (mut sink, mut stream) = ws.split();

            loop {
                tokio::select! {
                    cmd = cmd_rx.recv() => match cmd {
                        Some(Outbound::Frame(pcm)) => {
                            if let Err(e) = sink.send(Message::Binary(pcm)).await {
                                warn!("Failed to send audio frame: {}", e);
                                break;
                            }
                        }
                        Some(Outbound::End) => {
                            if let Err(e) = sink.send(Message::Text(end_command())).await {
                                warn!("Failed to send end-of-stream: {}", e);
                                break;
                            }
                        }
                        Some(Outbound::Close) | None => {
                            let _ = sink
                                .send(Message::Close(Some(CloseFrame {
                                    code: CloseCode::Normal,
                                    reason: "".into(),
                                })))
                                .await;
                            break;
                        }
                    },
                    msg = stream.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            // Parse failures are per-message and never
                            // terminate the connection
                            match SpeechEvent::parse(&text) {
                                Ok(event) => {
                                    if event_tx.send(event).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => warn!("Ignoring malformed speech message: {}", e),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            debug!("Speech service closed the connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Speech connection error: {}", e);
                            break;
                        }
                    },
                }
            }

            state.set(TransportState::Closed);
            info!("Speech transport closed");
        });

        Ok(Some(event_rx))
    }

    /// Queue one PCM frame for sending.
    ///
    /// Frames offered while the connection is not open are dropped, not
    /// queued. Returns whether the frame was accepted.
    pub async fn send_frame(&self, pcm: Vec<u8>) -> bool {
        if !self.is_open() {
            return false;
        }

        let outbound = self.outbound.lock().await;
        match outbound.as_ref() {
            Some(tx) => match tx.try_send(Outbound::Frame(pcm)) {
                Ok(()) => true,
                Err(_) => {
                    debug!("Speech frame dropped, outbound queue unavailable");
                    false
                }
            },
            None => false,
        }
    }

    /// Signal end-of-stream and close. Safe to call repeatedly.
    pub async fn stop(&self) {
        let tx = self.outbound.lock().await.take();
        let Some(tx) = tx else {
            return;
        };

        if self.is_open() {
            if tx.send(Outbound::End).await.is_ok() {
                // Let the control frame flush before closing
                tokio::time::sleep(self.settings.end_grace).await;
            }
            let _ = tx.send(Outbound::Close).await;
        }

        self.state.set(TransportState::Closed);
    }
}
