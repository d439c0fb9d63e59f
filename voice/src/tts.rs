//! Per-connection TTS handler (§4.I): `synthesize` in, `audio-start` /
//! one or more `audio-chunk` / `audio-stop` out, at the voice model's
//! native sample rate, 16-bit mono.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::inference::InferenceBackend;
use crate::types::{AudioFormat, Message, TtsProgramInfo};

const CHUNK_BYTES: usize = 4096;

pub async fn handle_connection(
    stream: TcpStream,
    cancel: CancellationToken,
    backend: Arc<dyn InferenceBackend>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "tts transport read failed, closing connection");
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

        match message {
            Message::Describe {} => {
                let reply = Message::Info {
                    asr: Vec::new(),
                    tts: vec![TtsProgramInfo {
                        name: "nightwatch-tts-sim".to_string(),
                        voices: vec!["en_US-lessac-medium".to_string()],
                    }],
                };
                if send(&mut write_half, &reply).await.is_err() {
                    break;
                }
            }
            Message::Synthesize { text, voice } => {
                match backend.synthesize(&text, voice.as_deref()).await {
                    Ok((pcm, rate)) => {
                        let format = AudioFormat { rate, width: 2, channels: 1 };
                        if send(&mut write_half, &Message::AudioStart { rate, width: 2, channels: 1 })
                            .await
                            .is_err()
                        {
                            break;
                        }
                        let mut closed = false;
                        for chunk in pcm.chunks(CHUNK_BYTES) {
                            if send(&mut write_half, &Message::audio_chunk(chunk, format)).await.is_err() {
                                closed = true;
                                break;
                            }
                        }
                        if closed {
                            break;
                        }
                        if send(&mut write_half, &Message::AudioStop {}).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        if send(&mut write_half, &Message::error(err.to_string())).await.is_err() {
                            break;
                        }
                    }
                }
            }
            Message::Error { text, .. } => {
                warn!(text, "peer reported an error");
            }
            _ => {
                if send(&mut write_half, &Message::error("message type not supported by the tts service"))
                    .await
                    .is_err()
                {
                    break;
                }
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
    async fn synthesize_yields_start_chunk_stop_sequence() {
        let backend: Arc<dyn InferenceBackend> = Arc::new(SimulatedBackend::new(22050));
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

        send(
            &mut write_half,
            &Message::Synthesize { text: "hello there".to_string(), voice: None },
        )
        .await
        .unwrap();

        let start: Message = serde_json::from_str(&client_lines.next_line().await.unwrap().unwrap()).unwrap();
        assert!(matches!(start, Message::AudioStart { rate: 22050, .. }));

        let mut saw_stop = false;
        for _ in 0..8 {
            let next: Message = serde_json::from_str(&client_lines.next_line().await.unwrap().unwrap()).unwrap();
            if matches!(next, Message::AudioStop {}) {
                saw_stop = true;
                break;
            }
        }
        assert!(saw_stop);
        cancel.cancel();
    }
}
