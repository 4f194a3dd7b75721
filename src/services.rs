use crate::backend::{ServiceAdapter, ServiceCommandConfig, ServiceEvent};
use crate::chat::OutboundMessage;
use crate::generation::GenerationMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub session_id: u64,
    pub prompt: String,
    pub db_type: String,
    pub mode: GenerationMode,
}

/// Seam between the main loop and the backing generator subprocess. The
/// orchestrator reducer never sees this trait; the loop dispatches through it
/// and feeds the drained events back in.
pub trait GenerationService {
    fn test_connection(&self) -> bool;
    fn begin(&mut self, request: &GenerationRequest);
    fn drain_events(&self, max_events: usize) -> Vec<ServiceEvent>;
    fn cancel(&mut self);
}

/// Seam for the conversational service. Context blocks queue up and attach to
/// the next outbound message.
pub trait ChatService {
    fn send_message(&mut self, outbound: &OutboundMessage);
    fn add_schema_context(&mut self, text: &str);
    fn add_query_history_context(&mut self, entries: &[String]);
    fn drain_events(&self, max_events: usize) -> Vec<ServiceEvent>;
}

pub struct CommandGenerationService {
    config: ServiceCommandConfig,
    adapter: Option<ServiceAdapter>,
}

impl CommandGenerationService {
    pub fn new(config: ServiceCommandConfig) -> Self {
        Self {
            config,
            adapter: None,
        }
    }

    pub fn set_command(&mut self, config: ServiceCommandConfig) {
        self.cancel();
        self.config = config;
    }
}

impl GenerationService for CommandGenerationService {
    fn test_connection(&self) -> bool {
        ServiceAdapter::with_config(self.config.clone()).probe()
    }

    fn begin(&mut self, request: &GenerationRequest) {
        if let Some(old) = self.adapter.take() {
            old.cancel();
        }
        let adapter = ServiceAdapter::with_config(self.config.clone());
        adapter.send_request(build_generation_request(request));
        self.adapter = Some(adapter);
    }

    fn drain_events(&self, max_events: usize) -> Vec<ServiceEvent> {
        match &self.adapter {
            Some(adapter) => adapter.drain_events_limited(max_events),
            None => Vec::new(),
        }
    }

    fn cancel(&mut self) {
        if let Some(adapter) = self.adapter.take() {
            adapter.cancel();
        }
    }
}

pub struct CommandChatService {
    adapter: ServiceAdapter,
    pending_context: Vec<String>,
}

impl CommandChatService {
    pub fn new(config: ServiceCommandConfig) -> Self {
        Self {
            adapter: ServiceAdapter::with_config(config),
            pending_context: Vec::new(),
        }
    }
}

impl ChatService for CommandChatService {
    fn send_message(&mut self, outbound: &OutboundMessage) {
        let context = std::mem::take(&mut self.pending_context);
        self.adapter
            .send_request(build_chat_request(outbound, &context));
    }

    fn add_schema_context(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.pending_context.push(format!("Current schema:\n{text}"));
        }
    }

    fn add_query_history_context(&mut self, entries: &[String]) {
        let lines: Vec<&str> = entries
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .collect();
        if !lines.is_empty() {
            self.pending_context
                .push(format!("Recent queries:\n{}", lines.join("\n")));
        }
    }

    fn drain_events(&self, max_events: usize) -> Vec<ServiceEvent> {
        self.adapter.drain_events_limited(max_events)
    }
}

pub(crate) fn build_generation_request(request: &GenerationRequest) -> String {
    serde_json::json!({
        "op": "generate",
        "prompt": request.prompt,
        "db_type": request.db_type,
        "mode": request.mode.label(),
    })
    .to_string()
}

pub(crate) fn build_chat_request(outbound: &OutboundMessage, context: &[String]) -> String {
    serde_json::json!({
        "op": "chat",
        "conversation_id": outbound.conversation_id,
        "message": outbound.text,
        "include_schema_context": outbound.include_schema_context,
        "include_history_context": outbound.include_history_context,
        "context": context,
    })
    .to_string()
}

#[cfg(test)]
#[path = "../tests/unit/services_tests.rs"]
mod tests;
