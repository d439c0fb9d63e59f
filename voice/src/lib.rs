pub mod inference;
pub mod server;
pub mod stt;
pub mod tts;
pub mod types;

pub use inference::{InferenceBackend, SimulatedBackend};
pub use types::{AudioFormat, Message};
