//! Per-connection STT state machine (§4.I): `idle -> streaming -> idle`.
//! An `audio-chunk` outside `streaming` is ignored at debug level and the
//! connection stays open (§9 open question, resolved that way).

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::inference::InferenceBackend;
use crate::types::{AudioFormat, Message, ProgramInfo};

enum State {
    Idle,
    Streaming { format: AudioFormat, buffer: Vec<u8> },
}

pub async fn handle_connection(
    stream: TcpStream,
    cancel: CancellationToken,
    backend: Arc<dyn InferenceBackend>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let mut state = State::Idle;

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "stt transport read failed, closing connection");
                break;
            }
        };

        let message: Message = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(err) => {
                if send(&mut write_half, &Message::error(err.to_string())).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let reply = match message {
            Message::Describe {} => Some(Message::Info {
                asr: vec![ProgramInfo {
                    name: "nightwatch-stt-sim".to_string(),
                    installed: true,
                    version: env!("CARGO_PKG_VERSION").to_string(),
                }],
                tts: Vec::new(),
            }),
            Message::AudioStart { rate, width, channels } => {
                state = State::Streaming {
                    format: AudioFormat { rate, width, channels },
                    buffer: Vec::new(),
                };
                None
            }
            Message::AudioChunk { audio, .. } => {
                match &mut state {
                    State::Streaming { buffer, .. } => match Message::decode_chunk_audio(&audio) {
                        Ok(pcm) => {
                            buffer.extend_from_slice(&pcm);
                            None
                        }
                        Err(err) => Some(Message::error(err.to_string())),
                    },
                    State::Idle => {
                        debug!("audio-chunk received outside streaming, ignoring");
                        None
                    }
                }
            }
            Message::AudioStop {} => match std::mem::replace(&mut state, State::Idle) {
                State::Streaming { format, buffer } => match backend.transcribe(&buffer, &format).await {
                    Ok(transcription) => Some(Message::Transcript {
                        text: transcription.text,
                        confidence: transcription.confidence,
                        is_final: true,
                    }),
                    Err(err) => Some(Message::error(err.to_string())),
                },
                State::Idle => None,
            },
            Message::Synthesize { .. } | Message::Transcript { .. } | Message::Info { .. } => {
                Some(Message::error("message type not supported by the stt service"))
            }
            Message::Error { text, .. } => {
                warn!(text, "peer reported an error");
                None
            }
        };

        if let Some(reply) = reply {
            if send(&mut write_half, &reply).await.is_err() {
                break;
            }
        }
    }
}

async fn send(writer: &mut (impl AsyncWriteExt + Unpin), message: &Message) -> std::io::Result<()> {
    let mut line = serde_json::to_string(message).expect("Message always serializes");
    line.push('\n');
    writer.write_all(line.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::SimulatedBackend;

    #[tokio::test]
    async fn full_utterance_round_trip_over_loopback() {
        let backend: Arc<dyn InferenceBackend> = Arc::new(SimulatedBackend::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let server_cancel = cancel.clone();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            handle_connection(stream, server_cancel, backend).await;
        });

        let client = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = client.into_split();
        let mut client_lines = BufReader::new(read_half).lines();

        send(&mut write_half, &Message::AudioStart { rate: 16000, width: 2, channels: 1 })
            .await
            .unwrap();
        send(
            &mut write_half,
            &Message::audio_chunk(&[1, 2, 3, 4], AudioFormat::default()),
        )
        .await
        .unwrap();
        send(&mut write_half, &Message::AudioStop {}).await.unwrap();

        let reply = client_lines.next_line().await.unwrap().unwrap();
        let message: Message = serde_json::from_str(&reply).unwrap();
        match message {
            Message::Transcript { confidence, .. } => assert!(confidence > 0.5),
            other => panic!("expected transcript, got {other:?}"),
        }
        cancel.cancel();
    }
}
