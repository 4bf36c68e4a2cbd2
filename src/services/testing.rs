// Scripted text generator for unit tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::providers::{GenerationOutput, GenerationRequest, ProviderError, TextGenerator};

enum Reply {
    Content(String),
    Status(u16),
    Pending,
}

pub struct ScriptedGenerator {
    reply: Reply,
    calls: AtomicUsize,
    last: Mutex<Option<GenerationRequest>>,
}

impl ScriptedGenerator {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn ok(content: &str) -> Self {
        Self::with_reply(Reply::Content(content.to_string()))
    }

    pub fn failing() -> Self {
        Self::with_reply(Reply::Status(503))
    }

    /// Never answers.
    pub fn pending() -> Self {
        Self::with_reply(Reply::Pending)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request.clone());
        match &self.reply {
            Reply::Content(content) => Ok(GenerationOutput {
                content: content.clone(),
                latency_ms: 1,
                model: "scripted".to_string(),
            }),
            Reply::Status(status) => Err(ProviderError::ApiError {
                status: *status,
                message: "service unavailable".to_string(),
            }),
            Reply::Pending => std::future::pending().await,
        }
    }
}
