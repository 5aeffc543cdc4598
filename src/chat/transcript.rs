//! Conversation transcript
//!
//! Append-only within a session; reset restores the configured system turn
//! (grounded sessions carry the prompt inside the data source instead).

use serde::Serialize;

/// Speaker role of a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt
    System,
    /// End-user query
    User,
    /// Model reply
    Assistant,
    /// Retrieval evidence from a grounded completion
    Tool,
}

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    /// Speaker role
    pub role: Role,

    /// Turn text
    pub content: String,
}

/// Ordered conversation history sent with every completion request
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Create a transcript seeded with an optional system turn
    #[must_use]
    pub fn new(system_prompt: Option<&str>) -> Self {
        let mut transcript = Self::default();
        transcript.reset(system_prompt);
        transcript
    }

    /// Clear all turns, restoring the system turn when one is configured
    pub fn reset(&mut self, system_prompt: Option<&str>) {
        self.turns.clear();
        if let Some(prompt) = system_prompt {
            self.push(Role::System, prompt);
        }
    }

    /// Append a turn; turns are never reordered
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(Turn {
            role,
            content: content.into(),
        });
    }

    /// All turns in order
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Most recent turn
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Number of turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the transcript holds no turns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_seeds_system_turn() {
        let transcript = Transcript::new(Some("You are helpful."));
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.turns()[0].role, Role::System);
    }

    #[test]
    fn test_new_grounded_is_empty() {
        let transcript = Transcript::new(None);
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_reset_restores_system_turn() {
        let mut transcript = Transcript::new(Some("prompt"));
        transcript.push(Role::User, "hi");
        transcript.push(Role::Assistant, "hello");
        assert_eq!(transcript.len(), 3);

        transcript.reset(Some("prompt"));
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.turns()[0].content, "prompt");
    }

    #[test]
    fn test_turns_keep_append_order() {
        let mut transcript = Transcript::new(None);
        transcript.push(Role::User, "a");
        transcript.push(Role::Tool, "b");
        transcript.push(Role::Assistant, "c");

        let roles: Vec<Role> = transcript.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Tool, Role::Assistant]);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let turn = Turn {
            role: Role::Assistant,
            content: "hi".to_string(),
        };
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
