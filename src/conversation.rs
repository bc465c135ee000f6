//! Paper selection and the chat exchange about it.
//!
//! Every selection starts a new generation. Requests carry the generation
//! they were issued under, and a completion whose generation is no longer
//! current is dropped instead of being appended to the wrong conversation.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ApiError;
use crate::models::{ChatMessage, Paper, Role};
use crate::render::escape_html;

pub const MAX_MESSAGE_CHARS: usize = 1000;

pub const NO_RESPONSE_TEXT: &str = "Sorry, I could not generate a response.";

pub const ERROR_MARKER: &str = "❌ **Error**";

pub fn error_text() -> String {
    format!(
        "{}: Could not get response from AI. Please try again.\n\n*This might be due to network issues or API limits.*",
        ERROR_MARKER
    )
}

pub fn welcome_text(paper: &Paper) -> String {
    format!(
        "**Welcome!** I'm ready to help you understand this paper: **\"{}\"**\n\n\
         Feel free to ask me about:\n\
         - 🔬 **Methodology**: How the research was conducted\n\
         - 📊 **Results**: Key findings and conclusions\n\
         - 🧠 **Concepts**: Technical terms and theories\n\
         - 🌐 **Context**: How this fits in the broader field\n\
         - 💡 **Implications**: Real-world applications and impact",
        escape_html(&paper.title)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    NoPaper,
    Idle,
    Awaiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    NoPaper,
    EmptyMessage,
    MessageTooLong,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Answered,
    NoContent,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ChatTicket {
    pub generation: u64,
    pub request: u64,
    pub paper_id: String,
    pub message: String,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
struct Selection {
    paper: Paper,
    messages: Vec<ChatMessage>,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
pub struct Conversation {
    selection: Option<Selection>,
    generation: u64,
    pending: Option<u64>,
    next_request: u64,
}

impl Conversation {
    pub fn select(&mut self, paper: Paper, now: DateTime<Utc>) {
        if let Some(previous) = self.selection.take() {
            previous.cancel.cancel();
        }
        self.pending = None;
        self.generation += 1;

        let welcome = ChatMessage::assistant(welcome_text(&paper), now);
        debug!("selected paper {} (generation {})", paper.id, self.generation);
        self.selection = Some(Selection {
            paper,
            messages: vec![welcome],
            cancel: CancellationToken::new(),
        });
    }

    pub fn send(&mut self, text: &str, now: DateTime<Utc>) -> Result<ChatTicket, SendRejected> {
        let text = text.trim();
        let Some(selection) = self.selection.as_mut() else {
            return Err(SendRejected::NoPaper);
        };
        if text.is_empty() {
            return Err(SendRejected::EmptyMessage);
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(SendRejected::MessageTooLong);
        }
        if self.pending.is_some() {
            return Err(SendRejected::Busy);
        }

        selection.messages.push(ChatMessage::user(text, now));
        self.next_request += 1;
        self.pending = Some(self.next_request);

        Ok(ChatTicket {
            generation: self.generation,
            request: self.next_request,
            paper_id: selection.paper.id.clone(),
            message: text.to_string(),
            cancel: selection.cancel.child_token(),
        })
    }

    /// Applies a chat completion. Returns `None` when the ticket is stale.
    pub fn complete(
        &mut self,
        ticket: &ChatTicket,
        result: Result<Option<String>, ApiError>,
        now: DateTime<Utc>,
    ) -> Option<Reply> {
        if !self.is_current(ticket) {
            debug!(
                "discarding chat response for {} (generation {}, current {})",
                ticket.paper_id, ticket.generation, self.generation
            );
            return None;
        }
        self.pending = None;

        let (reply, content) = match result {
            Ok(Some(text)) if !text.trim().is_empty() => (Reply::Answered, text),
            Ok(_) => (Reply::NoContent, NO_RESPONSE_TEXT.to_string()),
            Err(_) => (Reply::Failed, error_text()),
        };

        let selection = self.selection.as_mut()?;
        selection.messages.push(ChatMessage::assistant(content, now));
        Some(reply)
    }

    pub fn is_current(&self, ticket: &ChatTicket) -> bool {
        self.selection.is_some()
            && ticket.generation == self.generation
            && self.pending == Some(ticket.request)
    }

    /// Empties the message log of the current selection. Returns false when
    /// there was nothing beyond the welcome message.
    pub fn clear(&mut self) -> bool {
        let had_exchange = self.has_exchange();
        if let Some(selection) = self.selection.as_mut() {
            selection.messages.clear();
        }
        had_exchange
    }

    /// True once the user has sent at least one message.
    pub fn has_exchange(&self) -> bool {
        self.messages().iter().any(|m| m.role == Role::User)
    }

    pub fn state(&self) -> ConversationState {
        match (&self.selection, self.pending) {
            (None, _) => ConversationState::NoPaper,
            (Some(_), Some(_)) => ConversationState::Awaiting,
            (Some(_), None) => ConversationState::Idle,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        self.state() == ConversationState::Awaiting
    }

    pub fn paper(&self) -> Option<&Paper> {
        self.selection.as_ref().map(|s| &s.paper)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.selection
            .as_ref()
            .map(|s| s.messages.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::paper;

    #[test]
    fn test_select_resets_to_welcome_only() {
        let mut conv = Conversation::default();
        assert_eq!(conv.state(), ConversationState::NoPaper);

        conv.select(paper("1", "First"), Utc::now());
        for i in 0..3 {
            let ticket = conv.send(&format!("question {}", i), Utc::now()).unwrap();
            conv.complete(&ticket, Ok(Some("answer".to_string())), Utc::now());
        }
        assert_eq!(conv.messages().len(), 7);

        conv.select(paper("2", "Second"), Utc::now());
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].role, Role::Assistant);
        assert!(conv.messages()[0].content.contains("Second"));
    }

    #[test]
    fn test_welcome_escapes_title_markup() {
        let mut conv = Conversation::default();
        conv.select(paper("1", "A <script> paper"), Utc::now());
        assert!(!conv.messages()[0].content.contains("<script>"));
        assert_eq!(conv.state(), ConversationState::Idle);
    }

    #[test]
    fn test_send_requires_paper_and_text() {
        let mut conv = Conversation::default();
        assert_eq!(conv.send("hi", Utc::now()).unwrap_err(), SendRejected::NoPaper);

        conv.select(paper("1", "P"), Utc::now());
        assert_eq!(conv.send("   ", Utc::now()).unwrap_err(), SendRejected::EmptyMessage);
        let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(conv.send(&long, Utc::now()).unwrap_err(), SendRejected::MessageTooLong);
        assert_eq!(conv.messages().len(), 1);
    }

    #[test]
    fn test_one_request_in_flight() {
        let mut conv = Conversation::default();
        conv.select(paper("1", "P"), Utc::now());
        let ticket = conv.send("first", Utc::now()).unwrap();
        assert_eq!(conv.state(), ConversationState::Awaiting);
        assert_eq!(conv.send("second", Utc::now()).unwrap_err(), SendRejected::Busy);

        conv.complete(&ticket, Ok(Some("ok".to_string())), Utc::now());
        assert_eq!(conv.state(), ConversationState::Idle);
    }

    #[test]
    fn test_successful_exchange_has_three_messages() {
        let mut conv = Conversation::default();
        conv.select(paper("2301.00001", "P"), Utc::now());
        let ticket = conv.send("What method did they use?", Utc::now()).unwrap();
        assert_eq!(ticket.paper_id, "2301.00001");
        assert_eq!(ticket.message, "What method did they use?");

        let reply = conv.complete(
            &ticket,
            Ok(Some("They used **gradient descent**.".to_string())),
            Utc::now(),
        );
        assert_eq!(reply, Some(Reply::Answered));

        let roles: Vec<Role> = conv.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant]);
        assert_eq!(conv.messages()[2].content, "They used **gradient descent**.");
    }

    #[test]
    fn test_empty_response_uses_fallback() {
        let mut conv = Conversation::default();
        conv.select(paper("1", "P"), Utc::now());
        let ticket = conv.send("q", Utc::now()).unwrap();
        assert_eq!(conv.complete(&ticket, Ok(None), Utc::now()), Some(Reply::NoContent));
        assert_eq!(conv.messages().last().unwrap().content, NO_RESPONSE_TEXT);
    }

    #[test]
    fn test_failure_appends_exactly_one_error_message() {
        let mut conv = Conversation::default();
        conv.select(paper("1", "P"), Utc::now());
        let ticket = conv.send("q", Utc::now()).unwrap();
        let reply = conv.complete(
            &ticket,
            Err(ApiError::Status { status: 502, body: String::new() }),
            Utc::now(),
        );
        assert_eq!(reply, Some(Reply::Failed));
        assert_eq!(conv.messages().len(), 3);
        assert!(conv.messages()[2].content.starts_with(ERROR_MARKER));
        assert_eq!(conv.state(), ConversationState::Idle);
    }

    #[test]
    fn test_response_after_reselection_is_discarded() {
        let mut conv = Conversation::default();
        conv.select(paper("1", "Old"), Utc::now());
        let ticket = conv.send("q", Utc::now()).unwrap();

        conv.select(paper("2", "New"), Utc::now());
        assert!(ticket.cancel.is_cancelled());
        assert_eq!(conv.complete(&ticket, Ok(Some("late".to_string())), Utc::now()), None);
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.state(), ConversationState::Idle);
    }

    #[test]
    fn test_reselecting_same_paper_still_discards_old_response() {
        let mut conv = Conversation::default();
        conv.select(paper("1", "Same"), Utc::now());
        let ticket = conv.send("q", Utc::now()).unwrap();
        conv.select(paper("1", "Same"), Utc::now());
        assert_eq!(conv.complete(&ticket, Ok(Some("late".to_string())), Utc::now()), None);
    }

    #[test]
    fn test_clear_reports_whether_anything_was_exchanged() {
        let mut conv = Conversation::default();
        conv.select(paper("1", "P"), Utc::now());
        assert!(!conv.clear());

        conv.select(paper("1", "P"), Utc::now());
        let ticket = conv.send("q", Utc::now()).unwrap();
        conv.complete(&ticket, Ok(Some("a".to_string())), Utc::now());
        assert!(conv.clear());
        assert!(conv.messages().is_empty());
        assert!(conv.paper().is_some());
    }
}
