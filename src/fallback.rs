//! Best-effort degrade policy. Backend failures never reach the user: they
//! are swapped for a local session or a canned reply, and reported to the
//! operator through [`Diagnostics`].

use rand::seq::IndexedRandom;

use crate::backend::BackendError;

pub const DEMO_SESSION_ID: &str = "demo-session";

pub const DEFAULT_GREETING: &str =
    "Hello, welcome to my clinic. Would you like to book an appointment?";

pub const DEMO_REPLIES: [&str; 4] = [
    "I'd be happy to help you with that! Could you please provide more details?",
    "Let me check our available time slots for you. What day works best?",
    "I can help you cancel your appointment. May I have your booking reference?",
    "Thank you for contacting us. How can I assist you today?",
];

/// A failed probe still lights the connection indicator.
pub const REACHABLE_ON_FAILED_PROBE: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Health,
    StartChat,
    Chat,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Health => "health",
            Operation::StartChat => "start_chat",
            Operation::Chat => "chat",
        }
    }
}

/// Operator-facing hook invoked whenever a backend failure is absorbed.
pub trait Diagnostics: Send + Sync {
    fn fallback(&self, op: Operation, err: &BackendError);
}

/// Logs each absorbed failure and bumps `slotbot_fallbacks_total{operation}`
/// on the `metrics` facade. The binary installs no recorder, so the counter
/// only goes anywhere when an embedder installs one (e.g. a Prometheus
/// exporter); without it the increment is a no-op.
#[derive(Debug, Clone, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn fallback(&self, op: Operation, err: &BackendError) {
        tracing::warn!(operation = op.as_str(), error = %err, "backend call failed, using fallback");
        metrics::counter!("slotbot_fallbacks_total", "operation" => op.as_str()).increment(1);
    }
}

#[derive(Debug, Clone)]
pub struct FallbackReplies {
    replies: Vec<String>,
}

impl Default for FallbackReplies {
    fn default() -> Self {
        Self::new(DEMO_REPLIES.iter().map(|s| s.to_string()).collect())
    }
}

impl FallbackReplies {
    /// Empty or blank entries are dropped; an empty set reverts to the demo replies.
    pub fn new(replies: Vec<String>) -> Self {
        let replies: Vec<String> = replies.into_iter().filter(|r| !r.trim().is_empty()).collect();
        if replies.is_empty() {
            return Self::default();
        }
        Self { replies }
    }

    pub fn all(&self) -> &[String] {
        &self.replies
    }

    pub fn pick(&self) -> &str {
        self.replies
            .choose(&mut rand::rng())
            .map(String::as_str)
            .unwrap_or(DEMO_REPLIES[0])
    }
}
