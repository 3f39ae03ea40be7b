use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tokio::sync::Semaphore;

use crate::data::ImageAttachment;
use crate::providers::{Provider, ProviderFuture, ProviderResponse};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RecordedRequest {
    pub system: Vec<String>,
    pub user: Vec<String>,
    pub data: Vec<ImageAttachment>,
}

impl RecordedRequest {
    pub fn system(&self) -> String {
        self.system.join("\n\n")
    }

    pub fn is_detection(&self) -> bool {
        self.system().contains("Identify the language")
    }
}

type Responder = dyn Fn(&RecordedRequest) -> Result<String, String> + Send + Sync;

struct MockShared {
    requests: Mutex<Vec<RecordedRequest>>,
    responder: Box<Responder>,
    gate: Option<Semaphore>,
}

/// Records every request and answers through a responder closure. A gated
/// mock holds each reply until a permit is released.
#[derive(Clone)]
pub(crate) struct MockProvider {
    pending: RecordedRequest,
    shared: Arc<MockShared>,
}

impl MockProvider {
    pub fn replying<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Result<String, String> + Send + Sync + 'static,
    {
        Self::build(Box::new(responder), None)
    }

    pub fn gated<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Result<String, String> + Send + Sync + 'static,
    {
        Self::build(Box::new(responder), Some(Semaphore::new(0)))
    }

    pub fn with_text(text: &str) -> Self {
        let text = text.to_string();
        Self::replying(move |_| Ok(text.clone()))
    }

    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::replying(move |_| Err(message.clone()))
    }

    fn build(responder: Box<Responder>, gate: Option<Semaphore>) -> Self {
        Self {
            pending: RecordedRequest::default(),
            shared: Arc::new(MockShared {
                requests: Mutex::new(Vec::new()),
                responder,
                gate,
            }),
        }
    }

    /// Lets `count` gated replies through.
    pub fn release(&self, count: usize) {
        if let Some(gate) = self.shared.gate.as_ref() {
            gate.add_permits(count);
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.requests.lock().expect("mock requests").clone()
    }

    pub fn call_count(&self) -> usize {
        self.shared.requests.lock().expect("mock requests").len()
    }
}

impl Provider for MockProvider {
    fn model(&self) -> &str {
        "mock-model"
    }

    fn append_system_input(mut self, input: String) -> Self {
        self.pending.system.push(input);
        self
    }

    fn append_user_input(mut self, input: String) -> Self {
        self.pending.user.push(input);
        self
    }

    fn append_user_data(mut self, data: ImageAttachment) -> Self {
        self.pending.data.push(data);
        self
    }

    fn generate(self) -> ProviderFuture {
        Box::pin(async move {
            let request = self.pending;
            self.shared
                .requests
                .lock()
                .expect("mock requests")
                .push(request.clone());
            if let Some(gate) = self.shared.gate.as_ref() {
                gate.acquire().await.expect("mock gate closed").forget();
            }
            (self.shared.responder)(&request)
                .map(ProviderResponse::text)
                .map_err(|message| anyhow!(message))
        })
    }
}
