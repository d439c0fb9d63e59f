//! Voice coordinator (§4.J): audio capture -> STT -> LLM -> Tool Executor
//! -> TTS -> playback. Responses are queued with a bounded capacity and
//! `stop()` gives barge-in semantics by clearing the queue and signalling
//! whatever is currently playing to stop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::constants::voice::{MIN_CONFIDENCE, RESPONSE_QUEUE_CAPACITY};
use crate::tools::ToolExecutor;

use super::clarification;
use super::client::WyomingClient;
use super::llm::{LlmAction, LlmClient};
use super::wire::AudioFormat;

struct Queue {
    pending: Mutex<VecDeque<String>>,
    notify: Notify,
}

pub struct VoiceCoordinator {
    client: WyomingClient,
    tools: Arc<ToolExecutor>,
    llm: Arc<dyn LlmClient>,
    queue: Arc<Queue>,
    last_target: Mutex<Option<String>>,
    playback_stop: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl VoiceCoordinator {
    pub fn new(
        stt_addr: impl Into<String>,
        tts_addr: impl Into<String>,
        tools: Arc<ToolExecutor>,
        llm: Arc<dyn LlmClient>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let coordinator = Arc::new(Self {
            client: WyomingClient::new(stt_addr, tts_addr),
            tools,
            llm,
            queue: Arc::new(Queue {
                pending: Mutex::new(VecDeque::with_capacity(RESPONSE_QUEUE_CAPACITY)),
                notify: Notify::new(),
            }),
            last_target: Mutex::new(None),
            playback_stop: Arc::new(AtomicBool::new(false)),
            cancel,
        });
        coordinator.clone().spawn_playback_worker();
        coordinator
    }

    fn spawn_playback_worker(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    _ = self.queue.notify.notified() => {}
                }
                loop {
                    let next = self.queue.pending.lock().await.pop_front();
                    let Some(text) = next else { break };
                    if self.playback_stop.swap(false, Ordering::SeqCst) {
                        continue;
                    }
                    match self.client.synthesize(&text, None).await {
                        Ok(pcm) => info!(bytes = pcm.len(), "played synthesized response"),
                        Err(err) => warn!(error = %err, "tts synthesis failed"),
                    }
                }
            }
        });
    }

    /// Clears any queued responses and signals playback to stop (barge-in).
    pub async fn stop(&self) {
        self.queue.pending.lock().await.clear();
        self.playback_stop.store(true, Ordering::SeqCst);
    }

    async fn enqueue(&self, text: String) {
        let mut pending = self.queue.pending.lock().await;
        if pending.len() >= RESPONSE_QUEUE_CAPACITY {
            pending.pop_front();
        }
        pending.push_back(text);
        drop(pending);
        self.queue.notify.notify_one();
    }

    /// Runs one full turn over a captured utterance: transcription,
    /// clarification or tool dispatch, and a queued spoken response.
    pub async fn handle_utterance(&self, pcm: &[u8], format: AudioFormat) -> anyhow::Result<()> {
        let (text, confidence) = self.client.transcribe(pcm, format).await?;

        if confidence < MIN_CONFIDENCE {
            let last_target = self.last_target.lock().await.clone();
            let question = clarification::prompt(last_target.as_deref());
            self.enqueue(question).await;
            return Ok(());
        }

        let response = match self.llm.respond(&text).await? {
            LlmAction::Utterance(text) => text,
            LlmAction::ToolCall { name, params } => {
                if let Some(object_name) = params.get("object_name").and_then(|v| v.as_str()) {
                    *self.last_target.lock().await = Some(object_name.to_string());
                }
                let result = self.tools.execute(&name, params).await;
                summarize(&name, &result)
            }
        };

        self.enqueue(response).await;
        Ok(())
    }
}

fn summarize(tool: &str, result: &crate::tools::ToolResult) -> String {
    if result.message.is_empty() {
        if result.status == crate::tools::ToolStatus::Ok {
            format!("{tool} completed")
        } else {
            format!("{tool} failed: {:?}", result.status)
        }
    } else {
        result.message.clone()
    }
}
