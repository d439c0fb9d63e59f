//! Component J (§4.J): the orchestrator-side Wyoming client and the
//! voice coordinator that drives full STT -> LLM -> Tool Executor -> TTS
//! turns. Component I (the Wyoming servers themselves) is a separate
//! `voice` binary reached only over the network (§1, §4.H).

pub mod clarification;
pub mod client;
pub mod coordinator;
pub mod llm;
pub mod wire;

pub use client::WyomingClient;
pub use coordinator::VoiceCoordinator;
pub use llm::{LlmAction, LlmClient, StubLlmClient};
pub use wire::AudioFormat;
