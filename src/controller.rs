use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::backend::{BackendError, ChatBackend, ChatRequest};
use crate::fallback::{
    Diagnostics, FallbackReplies, Operation, DEFAULT_GREETING, DEMO_SESSION_ID, REACHABLE_ON_FAILED_PROBE,
};
use crate::session::{ChatSession, Message, MessageIds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickPrompt {
    BookAppointment,
    CheckTimeSlots,
    CancelAppointment,
    GeneralInquiry,
}

impl QuickPrompt {
    pub const ALL: [QuickPrompt; 4] = [
        QuickPrompt::BookAppointment,
        QuickPrompt::CheckTimeSlots,
        QuickPrompt::CancelAppointment,
        QuickPrompt::GeneralInquiry,
    ];

    pub fn text(&self) -> &'static str {
        match self {
            QuickPrompt::BookAppointment => "Book an appointment",
            QuickPrompt::CheckTimeSlots => "Check time slots",
            QuickPrompt::CancelAppointment => "Cancel appointment",
            QuickPrompt::GeneralInquiry => "General inquiry",
        }
    }

    /// 1-based menu position.
    pub fn from_index(n: usize) -> Option<Self> {
        n.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }
}

/// The user half of a turn, already in the thread, waiting on the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTurn {
    pub session_id: String,
    pub user_message: String,
}

impl PendingTurn {
    /// Runs the network half of the turn. Owns everything it needs so it can
    /// be spawned; the result goes back through [`ChatController::resolve_turn`].
    pub async fn exchange(self, backend: Arc<dyn ChatBackend>) -> TurnResult {
        let req = ChatRequest {
            session_id: self.session_id,
            user_message: self.user_message,
        };
        backend.chat(req).await.map(|r| r.chatbot_response)
    }
}

pub type TurnResult = Result<String, BackendError>;

pub struct ChatController {
    backend: Arc<dyn ChatBackend>,
    diagnostics: Arc<dyn Diagnostics>,
    replies: FallbackReplies,
    ids: MessageIds,
    session: Option<ChatSession>,
    input: String,
    pending: bool,
    backend_reachable: bool,
}

impl ChatController {
    pub fn new(backend: Arc<dyn ChatBackend>, diagnostics: Arc<dyn Diagnostics>, replies: FallbackReplies) -> Self {
        Self {
            backend,
            diagnostics,
            replies,
            ids: MessageIds::default(),
            session: None,
            input: String::new(),
            pending: false,
            backend_reachable: false,
        }
    }

    pub fn backend(&self) -> Arc<dyn ChatBackend> {
        Arc::clone(&self.backend)
    }

    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        self.session.as_ref().map(ChatSession::messages).unwrap_or(&[])
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn backend_reachable(&self) -> bool {
        self.backend_reachable
    }

    /// Opens the session and hands back the liveness probe, still running.
    /// The probe never holds up the session; its answer goes through
    /// [`ChatController::apply_health`] whenever it lands.
    pub async fn startup(&mut self) -> JoinHandle<bool> {
        let health = self.spawn_health_probe();
        self.initialize().await;
        health
    }

    pub async fn initialize(&mut self) {
        let (session_id, greeting) = self.start_session().await;
        self.open_session(session_id, greeting);
    }

    pub async fn check_health(&mut self) {
        let reachable = probe_health(self.backend(), Arc::clone(&self.diagnostics)).await;
        self.apply_health(reachable);
    }

    pub fn spawn_health_probe(&self) -> JoinHandle<bool> {
        tokio::spawn(probe_health(self.backend(), Arc::clone(&self.diagnostics)))
    }

    pub fn apply_health(&mut self, reachable: bool) {
        self.backend_reachable = reachable;
    }

    fn open_session(&mut self, session_id: String, greeting: String) {
        let welcome = self.ids.assistant(greeting);
        self.session = Some(ChatSession::new(session_id, welcome));
    }

    /// Returns the session id and welcome text, falling back to the demo session.
    async fn start_session(&self) -> (String, String) {
        match self.backend.start_chat().await {
            Ok(resp) => {
                let greeting = resp
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_GREETING.to_string());
                tracing::info!(session_id = %resp.session_id, "chat session started");
                (resp.session_id, greeting)
            }
            Err(err) => {
                self.diagnostics.fallback(Operation::StartChat, &err);
                tracing::info!(session_id = DEMO_SESSION_ID, "running in demo mode");
                (DEMO_SESSION_ID.to_string(), DEFAULT_GREETING.to_string())
            }
        }
    }

    /// Appends the user's message and marks the controller pending. `None`
    /// when there is no session or the text is blank.
    pub fn begin_turn(&mut self, text: &str) -> Option<PendingTurn> {
        if text.trim().is_empty() {
            return None;
        }
        let session = self.session.as_mut()?;
        session.append(self.ids.user(text));
        self.input.clear();
        self.pending = true;
        Some(PendingTurn {
            session_id: session.session_id.clone(),
            user_message: text.to_string(),
        })
    }

    /// Appends the assistant half of a turn: the backend's reply, or a
    /// canned one if the exchange failed. Always clears `pending`.
    pub fn resolve_turn(&mut self, result: TurnResult) -> Option<&Message> {
        self.pending = false;
        let content = match result {
            Ok(reply) => reply,
            Err(err) => {
                self.diagnostics.fallback(Operation::Chat, &err);
                self.replies.pick().to_string()
            }
        };
        let msg = self.ids.assistant(content);
        let session = self.session.as_mut()?;
        Some(session.append(msg))
    }

    pub async fn submit(&mut self, text: &str) -> Option<&Message> {
        let turn = self.begin_turn(text)?;
        let result = turn.exchange(self.backend()).await;
        self.resolve_turn(result)
    }

    pub async fn submit_input(&mut self) -> Option<&Message> {
        let text = self.input.clone();
        self.submit(&text).await
    }

    pub async fn quick_prompt(&mut self, prompt: QuickPrompt) -> Option<&Message> {
        self.submit(prompt.text()).await
    }
}

async fn probe_health(backend: Arc<dyn ChatBackend>, diagnostics: Arc<dyn Diagnostics>) -> bool {
    match backend.health().await {
        Ok(resp) => resp.status == "ok",
        Err(err) => {
            diagnostics.fallback(Operation::Health, &err);
            REACHABLE_ON_FAILED_PROBE
        }
    }
}
