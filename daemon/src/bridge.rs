//! Stdin/stdout bridge between a host page and one [`ProctorSession`].

use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use vigil_session::{ProctorSession, SessionEvent, ShutdownController};

use crate::protocol::{parse_line, HostMessage, HostReply};

/// Serialised output lines, written by one task so lines never interleave.
#[derive(Clone)]
pub struct Output {
    tx: mpsc::UnboundedSender<String>,
}

impl Output {
    /// Start the writer task over `sink`.
    pub fn start<W>(mut sink: W) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let handle = tokio::spawn(async move {
            while let Some(mut line) = rx.recv().await {
                line.push('\n');
                if let Err(e) = sink.write_all(line.as_bytes()).await {
                    tracing::error!(error = %e, "failed to write to host, output stopped");
                    break;
                }
                let _ = sink.flush().await;
            }
        });
        (Self { tx }, handle)
    }

    pub fn send<T: Serialize>(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(line) => {
                let _ = self.tx.send(line);
            }
            Err(e) => tracing::error!(error = %e, "failed to encode output"),
        }
    }
}

/// Forward every session event to the host until the session finishes.
pub fn forward_events(
    mut events: broadcast::Receiver<SessionEvent>,
    output: Output,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let finished = matches!(event, SessionEvent::Finished(_));
                    output.send(&event);
                    if finished {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "host output lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Apply one host message to the session.
pub fn dispatch(session: &ProctorSession, message: HostMessage, output: &Output) -> bool {
    let applied = match message {
        HostMessage::FullscreenEntered => session.enter_fullscreen(Ok(())),
        HostMessage::FullscreenFailed { error } => session.enter_fullscreen(Err(error)),
        HostMessage::Browser(event) => {
            let outcome = session.handle_browser_event(event);
            output.send(&HostReply::PreventDefault(outcome.prevent_default));
            Ok(())
        }
        HostMessage::Landmarks(result) => {
            session.handle_landmarks(&result);
            Ok(())
        }
        HostMessage::FaceSignal(signal) => {
            session.handle_face_signal(signal);
            Ok(())
        }
        HostMessage::Answer {
            question_id,
            answer,
        } => session.record_answer(question_id, answer),
        HostMessage::Submit => session.submit(),
        HostMessage::AckMessage => session.acknowledge_message(),
        HostMessage::Leave => return false,
    };
    if let Err(e) = applied {
        output.send(&HostReply::Error(e.to_string()));
    }
    true
}

/// Read host messages until the session finishes, the host leaves or closes
/// its end, or shutdown is signalled.
pub async fn pump_input<R>(
    session: &ProctorSession,
    input: R,
    output: &Output,
    shutdown: Arc<ShutdownController>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut shutdown_rx = shutdown.subscribe();
    loop {
        tokio::select! {
            biased;
            cause = shutdown_rx.recv() => {
                let cause = cause.map_or("closed", |c| c.as_str());
                tracing::info!(cause, "shutdown requested, leaving session");
                break;
            }
            state = session.wait_until_finished() => {
                tracing::info!(state = state.as_str(), "session finished");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match parse_line(&line) {
                    Ok(message) => {
                        if !dispatch(session, message, output) {
                            tracing::info!("host left the exam page");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "malformed host message");
                        output.send(&HostReply::Error(format!("malformed message: {e}")));
                    }
                },
                Ok(None) => {
                    tracing::info!("host input closed");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to read host input");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::io::AsyncReadExt;

    use vigil_client::ExamBackend;
    use vigil_nullables::NullBackend;
    use vigil_session::{LifecycleState, SessionConfig, ShutdownCause};
    use vigil_types::{Question, SessionId};

    fn questions() -> Vec<Question> {
        vec![Question {
            id: "q1".into(),
            text: "2 + 2?".into(),
            options: vec!["3".into(), "4".into()],
        }]
    }

    async fn session(backend: &Arc<NullBackend>) -> ProctorSession {
        ProctorSession::launch(
            SessionId::new("bridge-1"),
            SessionConfig::default(),
            Arc::clone(backend) as Arc<dyn ExamBackend>,
            None,
        )
        .await
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn host_script_drives_session_to_completion() {
        let backend = Arc::new(NullBackend::active(questions()));
        let session = session(&backend).await;
        let (writer, mut reader) = tokio::io::duplex(64 * 1024);
        let (output, writer_task) = Output::start(writer);
        let events = forward_events(session.subscribe(), output.clone());

        let script = concat!(
            r#"{"type":"fullscreen_entered"}"#, "\n",
            r#"{"type":"browser","event":"copy"}"#, "\n",
            "\n",
            r#"{"type":"bogus"}"#, "\n",
            r#"{"type":"answer","question_id":"q1","answer":1}"#, "\n",
            r#"{"type":"submit"}"#, "\n",
        );
        pump_input(
            &session,
            script.as_bytes(),
            &output,
            Arc::new(ShutdownController::new()),
        )
        .await;

        let state = tokio::time::timeout(Duration::from_secs(5), session.wait_until_finished())
            .await
            .unwrap();
        assert_eq!(state, LifecycleState::Completed);
        events.await.unwrap();
        drop(output);
        session.shutdown().await;
        writer_task.await.unwrap();

        let mut text = String::new();
        reader.read_to_string(&mut text).await.unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let types: Vec<&str> = lines.iter().map(|v| v["type"].as_str().unwrap()).collect();

        assert!(types.contains(&"prevent_default"));
        assert!(types.contains(&"warning"));
        assert!(types.contains(&"error"));
        assert_eq!(types.last(), Some(&"finished"));
        assert_eq!(backend.submissions().len(), 1);
        assert_eq!(backend.submissions()[0].1.len(), 1);
    }

    #[tokio::test]
    async fn leave_message_stops_reading() {
        let backend = Arc::new(NullBackend::active(questions()));
        let session = session(&backend).await;
        let (writer, _reader) = tokio::io::duplex(1024);
        let (output, _writer_task) = Output::start(writer);

        let script = "{\"type\":\"leave\"}\n{\"type\":\"submit\"}\n";
        pump_input(
            &session,
            script.as_bytes(),
            &output,
            Arc::new(ShutdownController::new()),
        )
        .await;

        assert_eq!(session.state(), LifecycleState::AwaitingFullscreen);
        session.shutdown().await;
        assert!(backend.submissions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn signal_stops_a_silent_host() {
        let backend = Arc::new(NullBackend::active(questions()));
        let session = session(&backend).await;
        let (writer, _reader) = tokio::io::duplex(1024);
        let (output, _writer_task) = Output::start(writer);
        let (_host, input) = tokio::io::duplex(1024);

        let shutdown = Arc::new(ShutdownController::new());
        let trigger = {
            let shutdown = Arc::clone(&shutdown);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                shutdown.shutdown(ShutdownCause::Interrupt);
            })
        };
        tokio::time::timeout(
            Duration::from_secs(5),
            pump_input(&session, tokio::io::BufReader::new(input), &output, shutdown),
        )
        .await
        .unwrap();
        trigger.await.unwrap();

        assert_eq!(session.state(), LifecycleState::AwaitingFullscreen);
        session.shutdown().await;
        assert!(backend.submissions().is_empty());
    }
}
