//! Wyoming wire protocol: one JSON object per line, tagged by `type` with
//! the payload nested under `data` (§6). `serde`'s internally-tagged
//! `content` representation produces exactly this shape for free.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramInfo {
    pub name: String,
    pub installed: bool,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsProgramInfo {
    pub name: String,
    pub voices: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AudioFormat {
    pub rate: u32,
    pub width: u8,
    pub channels: u8,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            rate: 16000,
            width: 2,
            channels: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Message {
    Describe {},
    Info {
        asr: Vec<ProgramInfo>,
        tts: Vec<TtsProgramInfo>,
    },
    AudioStart {
        rate: u32,
        width: u8,
        channels: u8,
    },
    AudioChunk {
        audio: String,
        rate: u32,
        width: u8,
        channels: u8,
    },
    AudioStop {},
    Transcript {
        text: String,
        confidence: f32,
        is_final: bool,
    },
    Synthesize {
        text: String,
        voice: Option<String>,
    },
    Error {
        text: String,
        code: Option<String>,
    },
}

impl Message {
    pub fn error(text: impl Into<String>) -> Self {
        Message::Error {
            text: text.into(),
            code: None,
        }
    }

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_start_matches_canonical_wire_shape() {
        let msg = Message::AudioStart {
            rate: 16000,
            width: 2,
            channels: 1,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "audio-start");
        assert_eq!(json["data"]["rate"], 16000);
    }

    #[test]
    fn describe_has_empty_data_object() {
        let json = serde_json::to_value(Message::Describe {}).unwrap();
        assert_eq!(json["type"], "describe");
        assert!(json["data"].is_object());
    }

    #[test]
    fn chunk_round_trips_through_base64() {
        let pcm = vec![1u8, 2, 3, 4, 5];
        let msg = Message::audio_chunk(&pcm, AudioFormat::default());
        if let Message::AudioChunk { audio, .. } = msg {
            assert_eq!(Message::decode_chunk_audio(&audio).unwrap(), pcm);
        } else {
            panic!("expected AudioChunk");
        }
    }

    #[test]
    fn unknown_type_fails_to_parse() {
        let result: Result<Message, _> = serde_json::from_str(r#"{"type":"nonsense","data":{}}"#);
        assert!(result.is_err());
    }
}
