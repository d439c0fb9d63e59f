//! A thin Wyoming client (§4.J): one fresh connection per STT/TTS call,
//! the same relationship the teacher's `HttpAgentManager` has to its
//! `agent` binary, just over a line-delimited JSON socket instead of HTTP.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::wire::{AudioFormat, Message};

pub struct WyomingClient {
    stt_addr: String,
    tts_addr: String,
}

impl WyomingClient {
    pub fn new(stt_addr: impl Into<String>, tts_addr: impl Into<String>) -> Self {
        Self {
            stt_addr: stt_addr.into(),
            tts_addr: tts_addr.into(),
        }
    }

    pub async fn transcribe(&self, pcm: &[u8], format: AudioFormat) -> anyhow::Result<(String, f32)> {
        let stream = TcpStream::connect(&self.stt_addr).await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        send(&mut write_half, &Message::AudioStart {
            rate: format.rate,
            width: format.width,
            channels: format.channels,
        })
        .await?;
        send(&mut write_half, &Message::audio_chunk(pcm, format)).await?;
        send(&mut write_half, &Message::AudioStop {}).await?;

        let line = lines
            .next_line()
            .await?
            .ok_or_else(|| anyhow::anyhow!("stt connection closed before a transcript arrived"))?;
        match serde_json::from_str(&line)? {
            Message::Transcript { text, confidence, .. } => Ok((text, confidence)),
            Message::Error { text, .. } => Err(anyhow::anyhow!("stt service error: {text}")),
            other => Err(anyhow::anyhow!("unexpected stt reply: {other:?}")),
        }
    }

    pub async fn synthesize(&self, text: &str, voice: Option<&str>) -> anyhow::Result<Vec<u8>> {
        let stream = TcpStream::connect(&self.tts_addr).await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        send(&mut write_half, &Message::Synthesize {
            text: text.to_string(),
            voice: voice.map(str::to_string),
        })
        .await?;

        let start = lines
            .next_line()
            .await?
            .ok_or_else(|| anyhow::anyhow!("tts connection closed before audio-start"))?;
        match serde_json::from_str(&start)? {
            Message::AudioStart { .. } => {}
            Message::Error { text, .. } => return Err(anyhow::anyhow!("tts service error: {text}")),
            other => return Err(anyhow::anyhow!("unexpected tts reply: {other:?}")),
        }

        let mut pcm = Vec::new();
        loop {
            let line = lines
                .next_line()
                .await?
                .ok_or_else(|| anyhow::anyhow!("tts connection closed mid-stream"))?;
            match serde_json::from_str(&line)? {
                Message::AudioChunk { audio, .. } => pcm.extend(Message::decode_chunk_audio(&audio)?),
                Message::AudioStop {} => break,
                Message::Error { text, .. } => return Err(anyhow::anyhow!("tts service error: {text}")),
                other => return Err(anyhow::anyhow!("unexpected tts reply: {other:?}")),
            }
        }
        Ok(pcm)
    }
}

async fn send(writer: &mut (impl AsyncWriteExt + Unpin), message: &Message) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}
