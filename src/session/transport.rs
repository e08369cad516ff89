// WebSocket client for the interview service.
//
// The service authenticates via a token passed as a query parameter.
// Questions arrive as JSON text messages; synthesized interviewer speech
// can arrive either inlined in a question or as a raw binary frame.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::event::{AnswerFrame, SessionEvent};
use crate::transport::{StateCell, TransportState};

/// Interview service connection settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Interview service WebSocket URL
    pub url: String,
    /// Bearer token, appended as a query parameter
    pub token: String,
}

/// What the reader task forwards to the session loop
#[derive(Debug)]
pub enum SessionSignal {
    Event(SessionEvent),
    /// The connection ended; `normal` is false for abnormal closes and
    /// transport errors, which surface as a connection-lost warning
    Closed { normal: bool },
}

enum Outbound {
    Answer(String),
    Close,
}

pub struct SessionTransport {
    settings: SessionSettings,
    state: StateCell,
    outbound: Mutex<Option<mpsc::Sender<Outbound>>>,
    opened_at: Mutex<Option<Instant>>,
}

impl SessionTransport {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            state: StateCell::new(),
            outbound: Mutex::new(None),
            opened_at: Mutex::new(None),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state.get()
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// How long the connection has been open, None before connect
    pub async fn elapsed(&self) -> Option<std::time::Duration> {
        self.opened_at.lock().await.map(|t| t.elapsed())
    }

    fn authenticated_url(&self) -> String {
        let sep = if self.settings.url.contains('?') { '&' } else { '?' };
        format!("{}{}token={}", self.settings.url, sep, self.settings.token)
    }

    /// Connect to the interview service and return the inbound signal
    /// stream. No-op (returns None) when already open.
    pub async fn start(&self) -> Result<Option<mpsc::Receiver<SessionSignal>>> {
        if self.is_open() {
            debug!("Session transport already open");
            return Ok(None);
        }

        self.state.set(TransportState::Connecting);
        info!("Connecting to interview service: {}", self.settings.url);

        let (ws, _) = connect_async(&self.authenticated_url())
            .await
            .context("Failed to connect to interview service")
            .inspect_err(|_| self.state.set(TransportState::Closed))?;

        self.state.set(TransportState::Open);
        *self.opened_at.lock().await = Some(Instant::now());
        info!("Interview service connected");

        let (cmd_tx, mut cmd_rx) = mpsc::channel::<Outbound>(16);
        let (signal_tx, signal_rx) = mpsc::channel::<SessionSignal>(64);
        *self.outbound.lock().await = Some(cmd_tx);

        let state = self.state.clone();
        tokio::spawn(async move {
            let (mut sink, mut stream) = ws.split();
            let mut normal_close = false;

            loop {
                tokio::select! {
                    cmd = cmd_rx.recv() => match cmd {
                        Some(Outbound::Answer(json)) => {
                            if let Err(e) = sink.send(Message::Text(json)).await {
                                warn!("Failed to send answer: {}", e);
                                break;
                            }
                        }
                        Some(Outbound::Close) | None => {
                            normal_close = true;
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
                        Some(Ok(Message::Text(text))) => match SessionEvent::parse(&text) {
                            Ok(Some(event)) => {
                                if signal_tx.send(SessionSignal::Event(event)).await.is_err() {
                                    break;
                                }
                            }
                            Ok(None) => debug!("Ignoring non-question service message"),
                            Err(e) => warn!("Ignoring malformed service message: {}", e),
                        },
                        Some(Ok(Message::Binary(bytes))) => {
                            if signal_tx
                                .send(SessionSignal::Event(SessionEvent::Audio(bytes)))
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            normal_close = frame
                                .as_ref()
                                .map(|f| f.code == CloseCode::Normal)
                                .unwrap_or(false)
                                || normal_close;
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Interview connection error: {}", e);
                            break;
                        }
                        None => break,
                    },
                }
            }

            state.set(TransportState::Closed);
            if normal_close {
                info!("Interview connection closed");
            } else {
                warn!("Interview connection lost");
            }
            let _ = signal_tx
                .send(SessionSignal::Closed {
                    normal: normal_close,
                })
                .await;
        });

        Ok(Some(signal_rx))
    }

    /// Send one answer frame. Rejected client-side when the connection is
    /// not open or the answer text is empty.
    pub async fn send_answer(&self, seq: i64, answer: &str) -> Result<()> {
        if answer.trim().is_empty() {
            anyhow::bail!("Refusing to send an empty answer");
        }
        if !self.is_open() {
            anyhow::bail!("Interview connection is not open");
        }

        let frame = AnswerFrame {
            seq,
            answer: answer.to_string(),
        };
        let json = frame.to_json()?;

        let outbound = self.outbound.lock().await;
        let tx = outbound
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Interview connection is not open"))?;
        tx.send(Outbound::Answer(json))
            .await
            .map_err(|_| anyhow::anyhow!("Interview connection is shutting down"))?;

        debug!("Answer queued for seq {}", seq);
        Ok(())
    }

    /// Close the connection with a normal close frame. Safe to call
    /// repeatedly.
    pub async fn close(&self) {
        let tx = self.outbound.lock().await.take();
        if let Some(tx) = tx {
            let _ = tx.send(Outbound::Close).await;
        }
        self.state.set(TransportState::Closed);
    }
}
