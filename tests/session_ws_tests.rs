// Integration tests for the interview service client and the session
// coordinator, run against a scripted in-process server.

use anyhow::Result;
use futures::{SinkExt, StreamExt};
use interview_session::session::coordinator::SessionCoordinator;
use interview_session::session::transport::SessionSignal;
use interview_session::session::SessionEvent;
use interview_session::speech::{SpeechSettings, SpeechTransport, WavFileSink};
use interview_session::{
    CapturePrefs, MediaDevices, NullBackend, NullCapture, RecorderSettings, ScreenRecorder,
    SessionSettings, SessionTransport, SpeechPlayback,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, accept_hdr_async};

type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

async fn spawn_server<F, Fut>(handler: F) -> Result<String>
where
    F: FnOnce(ServerWs) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = accept_async(stream).await {
                handler(ws).await;
            }
        }
    });

    Ok(format!("ws://{}/", addr))
}

fn settings(url: String) -> SessionSettings {
    SessionSettings {
        url,
        token: "test-token".to_string(),
    }
}

#[tokio::test]
async fn test_token_is_sent_as_query_parameter() -> Result<()> {
    let (uri_tx, mut uri_rx) = mpsc::unbounded_channel::<String>();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            let callback = move |req: &Request, resp: Response| {
                uri_tx.send(req.uri().to_string()).ok();
                Ok(resp)
            };
            if let Ok(mut ws) = accept_hdr_async(stream, callback).await {
                ws.send(Message::Close(None)).await.ok();
            }
        }
    });

    let transport = Arc::new(SessionTransport::new(settings(format!("ws://{}/", addr))));
    transport.start().await?;

    let uri = uri_rx.recv().await.expect("handshake uri");
    assert!(uri.contains("token=test-token"), "got {}", uri);
    Ok(())
}

#[tokio::test]
async fn test_question_events_and_answer_frame() -> Result<()> {
    let (answer_tx, mut answer_rx) = mpsc::unbounded_channel::<String>();

    let url = spawn_server(move |mut ws| async move {
        ws.send(Message::Text(
            r#"{"type":"QUESTION","question":"Tell me about yourself","score":0,"seq":0}"#
                .to_string(),
        ))
        .await
        .unwrap();

        // Forward the client's answer to the test, then close normally
        if let Some(Ok(Message::Text(text))) = ws.next().await {
            answer_tx.send(text).ok();
        }
        ws.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        })))
        .await
        .ok();
    })
    .await?;

    let transport = Arc::new(SessionTransport::new(settings(url)));
    let mut signals = transport.start().await?.expect("signal stream");

    match signals.recv().await {
        Some(SessionSignal::Event(SessionEvent::Question { question, seq, .. })) => {
            assert_eq!(question, "Tell me about yourself");
            assert_eq!(seq, 0);
        }
        other => panic!("expected question, got {:?}", other),
    }

    transport.send_answer(1, "I am a test").await?;

    let raw = answer_rx.recv().await.expect("answer frame");
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(value["seq"], 1);
    assert_eq!(value["answer"], "I am a test");

    match signals.recv().await {
        Some(SessionSignal::Closed { normal }) => assert!(normal),
        other => panic!("expected close, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_binary_frames_become_audio_events() -> Result<()> {
    let url = spawn_server(|mut ws| async move {
        ws.send(Message::Binary(vec![9, 9, 9])).await.unwrap();
        ws.send(Message::Close(None)).await.ok();
    })
    .await?;

    let transport = Arc::new(SessionTransport::new(settings(url)));
    let mut signals = transport.start().await?.expect("signal stream");

    match signals.recv().await {
        Some(SessionSignal::Event(SessionEvent::Audio(bytes))) => {
            assert_eq!(bytes, vec![9, 9, 9]);
        }
        other => panic!("expected audio event, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_abnormal_close_is_flagged() -> Result<()> {
    let url = spawn_server(|ws| async move {
        // Drop the connection without a close handshake
        drop(ws);
    })
    .await?;

    let transport = Arc::new(SessionTransport::new(settings(url)));
    let mut signals = transport.start().await?.expect("signal stream");

    match signals.recv().await {
        Some(SessionSignal::Closed { normal }) => assert!(!normal),
        other => panic!("expected abnormal close, got {:?}", other),
    }
    assert!(!transport.is_open());
    Ok(())
}

#[tokio::test]
async fn test_answers_rejected_client_side() -> Result<()> {
    let url = spawn_server(|mut ws| async move {
        while let Some(Ok(msg)) = ws.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    })
    .await?;

    let transport = Arc::new(SessionTransport::new(settings(url.clone())));

    // Not connected yet
    assert!(transport.send_answer(1, "answer").await.is_err());

    transport.start().await?;
    // Empty answers never go out
    assert!(transport.send_answer(1, "").await.is_err());
    assert!(transport.send_answer(1, "   ").await.is_err());
    assert!(transport.send_answer(1, "real answer").await.is_ok());

    transport.close().await;
    assert!(transport.send_answer(2, "after close").await.is_err());
    Ok(())
}

fn coordinator_for(url: String, temp_dir: &TempDir) -> SessionCoordinator {
    let devices = Arc::new(MediaDevices::new(Arc::new(NullBackend::new(48_000))));
    let speech = Arc::new(SpeechTransport::new(SpeechSettings {
        url: "ws://127.0.0.1:1".to_string(),
        connect_timeout: Duration::from_millis(100),
        end_grace: Duration::from_millis(20),
    }));
    let session = Arc::new(SessionTransport::new(settings(url)));
    let recorder = Arc::new(ScreenRecorder::new(
        Arc::new(NullCapture),
        CapturePrefs::default(),
        RecorderSettings {
            output_dir: temp_dir.path().join("recordings"),
            file_prefix: "interview".to_string(),
        },
    ));
    let playback = Arc::new(SpeechPlayback::new(Arc::new(WavFileSink::new(
        temp_dir.path().join("utterances"),
    ))));

    SessionCoordinator::new(devices, speech, session, recorder, playback)
}

#[tokio::test]
async fn test_coordinator_runs_full_exchange() -> Result<()> {
    let (answer_tx, mut answer_rx) = mpsc::unbounded_channel::<String>();

    let url = spawn_server(move |mut ws| async move {
        ws.send(Message::Text(
            r#"{"type":"QUESTION","question":"First question","score":0,"seq":0}"#.to_string(),
        ))
        .await
        .unwrap();

        if let Some(Ok(Message::Text(text))) = ws.next().await {
            answer_tx.send(text).ok();
        }

        ws.send(Message::Text(
            r#"{"type":"QUESTION","question":"Second question","score":3,"seq":1}"#.to_string(),
        ))
        .await
        .unwrap();

        // Hold the connection open until the client closes it
        while let Some(Ok(msg)) = ws.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    })
    .await?;

    let temp_dir = TempDir::new()?;
    let coordinator = coordinator_for(url, &temp_dir);

    // Before any question arrives, answering is rejected
    assert!(coordinator.send_answer("too early").await.is_err());

    coordinator.start().await?;

    let state = coordinator.state();
    for _ in 0..100 {
        if state.lock().await.question_received() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(state.lock().await.question_received());

    coordinator.send_answer("my first answer").await?;
    let raw = answer_rx.recv().await.expect("answer frame");
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(value["seq"], 1);

    for _ in 0..100 {
        if state.lock().await.last_seq() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    {
        let state = state.lock().await;
        assert_eq!(state.score(), 3);
        // Greeting + question + answer + question
        assert!(state.messages().len() >= 4);
        assert_eq!(state.next_seq(), 2);
    }

    let stats = coordinator.end(true).await?;
    assert_eq!(stats.questions_received, 2);
    assert_eq!(stats.answers_sent, 1);
    assert_eq!(stats.score, 3);
    assert!(!stats.connected);
    Ok(())
}

#[tokio::test]
async fn test_end_requires_confirmation_while_recording() -> Result<()> {
    let url = spawn_server(|mut ws| async move {
        while let Some(Ok(msg)) = ws.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    })
    .await?;

    let temp_dir = TempDir::new()?;
    let coordinator = coordinator_for(url, &temp_dir);

    coordinator.start().await?;
    coordinator.start_recording().await?;

    assert!(coordinator.end(false).await.is_err());

    let stats = coordinator.end(true).await?;
    assert!(!stats.is_recording);
    Ok(())
}
