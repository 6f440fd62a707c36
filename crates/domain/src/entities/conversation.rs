//! Conversation entity - the in-memory transcript of one voice session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChatMessage, MessageRole};
use crate::value_objects::{ConversationId, UserName};

/// Default number of user/assistant turn pairs kept in the context window.
/// Balances context against request latency.
pub const DEFAULT_MAX_TURN_PAIRS: usize = 4;

const NAME_SENTENCE_PREFIX: &str = "\n\nThe user's name is ";

/// A conversation: one pinned system turn followed by user/assistant turns.
///
/// Invariant: `messages[0]` is always the system turn. History is trimmed to
/// a fixed window of trailing turn pairs while the system turn is preserved
/// verbatim (and may be rewritten in place when the user's name is learned).
/// Never persisted beyond the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique session identifier
    pub id: ConversationId,
    /// System turn followed by user/assistant turns (oldest first)
    messages: Vec<ChatMessage>,
    /// When the session started
    pub created_at: DateTime<Utc>,
    /// Name learned from a spoken introduction, if any
    user_name: Option<UserName>,
}

impl Conversation {
    /// Create a new conversation seeded with a system turn
    pub fn with_system_prompt(system_prompt: impl Into<String>) -> Self {
        Self {
            id: ConversationId::new(),
            messages: vec![ChatMessage::system(system_prompt)],
            created_at: Utc::now(),
            user_name: None,
        }
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    /// Append an assistant turn
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// All turns, system turn first
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The system turn's current content
    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    /// Number of turns including the system turn
    pub fn turn_count(&self) -> usize {
        self.messages.len()
    }

    /// The name learned this session, if any
    pub const fn user_name(&self) -> Option<&UserName> {
        self.user_name.as_ref()
    }

    /// Drop all but the last `max_pairs` user/assistant turn pairs.
    ///
    /// The system turn is never dropped.
    pub fn trim_to_window(&mut self, max_pairs: usize) {
        let keep = max_pairs * 2;
        let tail_len = self.messages.len() - 1;
        if tail_len > keep {
            self.messages.drain(1..self.messages.len() - keep);
        }
    }

    /// Record the user's name and rewrite the system turn so the model can
    /// use it. A previously injected name sentence is replaced, not stacked.
    pub fn set_user_name(&mut self, name: UserName) {
        let system = &mut self.messages[0];
        debug_assert_eq!(system.role, MessageRole::System);

        let mut base = system.content.clone();
        if let Some(idx) = base.find(NAME_SENTENCE_PREFIX) {
            base.truncate(idx);
        }
        system.content = format!(
            "{base}{NAME_SENTENCE_PREFIX}{name}. Use it naturally sometimes, \
             especially when greeting or confirming."
        );
        self.user_name = Some(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv() -> Conversation {
        Conversation::with_system_prompt("You are a friendly conversation partner.")
    }

    #[test]
    fn first_turn_is_always_system() {
        let c = conv();
        assert_eq!(c.messages()[0].role, MessageRole::System);
        assert_eq!(c.turn_count(), 1);
    }

    #[test]
    fn turns_append_in_order() {
        let mut c = conv();
        c.push_user("hi");
        c.push_assistant("hello!");
        assert_eq!(c.turn_count(), 3);
        assert_eq!(c.messages()[1].role, MessageRole::User);
        assert_eq!(c.messages()[2].role, MessageRole::Assistant);
    }

    #[test]
    fn trim_keeps_system_turn_and_tail() {
        let mut c = conv();
        for i in 0..10 {
            c.push_user(format!("q{i}"));
            c.push_assistant(format!("a{i}"));
        }
        c.trim_to_window(DEFAULT_MAX_TURN_PAIRS);

        assert_eq!(c.turn_count(), 1 + DEFAULT_MAX_TURN_PAIRS * 2);
        assert_eq!(c.messages()[0].role, MessageRole::System);
        // Oldest surviving turn is q6, the newest is a9.
        assert_eq!(c.messages()[1].content, "q6");
        assert_eq!(c.messages().last().unwrap().content, "a9");
    }

    #[test]
    fn trim_is_noop_when_under_window() {
        let mut c = conv();
        c.push_user("q");
        c.push_assistant("a");
        c.trim_to_window(4);
        assert_eq!(c.turn_count(), 3);
    }

    #[test]
    fn set_user_name_rewrites_system_turn() {
        let mut c = conv();
        let name = UserName::parse("alex").unwrap();
        c.set_user_name(name);

        assert!(c.system_prompt().contains("The user's name is Alex."));
        assert!(c.system_prompt().starts_with("You are a friendly"));
        assert_eq!(c.user_name().unwrap().as_str(), "Alex");
    }

    #[test]
    fn set_user_name_replaces_previous_name() {
        let mut c = conv();
        c.set_user_name(UserName::parse("alex").unwrap());
        c.set_user_name(UserName::parse("sam").unwrap());

        let prompt = c.system_prompt();
        assert!(prompt.contains("The user's name is Sam."));
        assert!(!prompt.contains("Alex"));
        assert_eq!(prompt.matches("The user's name is").count(), 1);
    }

    #[test]
    fn trim_preserves_rewritten_system_turn() {
        let mut c = conv();
        c.set_user_name(UserName::parse("alex").unwrap());
        for i in 0..10 {
            c.push_user(format!("q{i}"));
            c.push_assistant(format!("a{i}"));
        }
        c.trim_to_window(2);
        assert!(c.system_prompt().contains("Alex"));
        assert_eq!(c.turn_count(), 5);
    }

    #[test]
    fn conversations_have_unique_ids() {
        assert_ne!(conv().id, conv().id);
    }
}
