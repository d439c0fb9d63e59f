//! The Wyoming wire shapes, defined independently of the `voice` crate.
//! The voice coordinator talks to the Wyoming servers only over the
//! network (§1, §4.H deployment note); there is no shared library
//! boundary to reuse, only the line-delimited JSON contract (§6).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AudioFormat {
    pub rate: u32,
    pub width: u8,
    pub channels: u8,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            rate: crate::constants::wyoming::SAMPLE_RATE_HZ,
            width: 2,
            channels: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Message {
    AudioStart { rate: u32, width: u8, channels: u8 },
    AudioChunk { audio: String, rate: u32, width: u8, channels: u8 },
    AudioStop {},
    Transcript { text: String, confidence: f32, is_final: bool },
    Synthesize { text: String, voice: Option<String> },
    Error { text: String, code: Option<String> },
}

impl Message {
    pub fn audio_chunk(pcm: &[u8], format: AudioFormat) -> Self {
        Message::AudioChunk {
            audio: STANDARD.encode(pcm),
            rate: format.rate,
            width: format.width,
            channels: format.channels,
        }
    }

    pub fn decode_chunk_audio(audio: &str) -> anyhow::Result<Vec<u8>> {
        Ok(STANDARD.decode(audio)?)
    }
}
