use crate::providers::{Message, Role};
use std::collections::VecDeque;
use tracing::debug;

/// 20 exchanges.
pub const MAX_HISTORY_MESSAGES: usize = 40;

/// Bounded conversation log plus the system prompt it was started under.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    messages: VecDeque<Message>,
    system_prompt: String,
    capacity: usize,
}

impl ConversationSession {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self::with_capacity(system_prompt, MAX_HISTORY_MESSAGES)
    }

    pub fn with_capacity(system_prompt: impl Into<String>, capacity: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            system_prompt: system_prompt.into(),
            capacity: capacity.max(1),
        }
    }

    /// Appends and trims the oldest entries past capacity, returning what was dropped.
    pub fn add_message(&mut self, role: Role, content: impl Into<String>) -> Vec<Message> {
        self.messages.push_back(Message::new(role, content));
        let mut evicted = Vec::new();
        while self.messages.len() > self.capacity {
            if let Some(oldest) = self.messages.pop_front() {
                evicted.push(oldest);
            }
        }
        if !evicted.is_empty() {
            debug!(dropped = evicted.len(), kept = self.messages.len(), "trimmed conversation history");
        }
        evicted
    }

    /// Clears all history and switches to `system_prompt`.
    pub fn restart(&mut self, system_prompt: impl Into<String>) {
        self.messages.clear();
        self.system_prompt = system_prompt.into();
        debug!("conversation restarted");
    }

    /// Clears history, keeping the current system prompt.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Owned snapshot; callers cannot reach internal state through it.
    pub fn history(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Removes the newest message only if it is an unanswered user message.
    pub fn rollback_last_user_message(&mut self) -> bool {
        match self.messages.back() {
            Some(last) if last.role == Role::User => {
                self.messages.pop_back();
                true
            }
            _ => false,
        }
    }

    /// Tentatively appends the user message. Dropping the returned guard without
    /// committing puts the history back exactly as it was.
    pub fn begin_turn(&mut self, message: &str) -> PendingTurn<'_> {
        let prior = self.history();
        let evicted = self.add_message(Role::User, message);
        PendingTurn {
            session: self,
            prior,
            evicted,
            replaced: None,
            committed: false,
        }
    }

    /// Restarts under `system_prompt`, then begins a turn. Dropping the guard
    /// without committing brings back the old history and prompt as well.
    pub fn begin_turn_after_restart(
        &mut self,
        system_prompt: impl Into<String>,
        message: &str,
    ) -> PendingTurn<'_> {
        let messages = std::mem::take(&mut self.messages);
        let prompt = std::mem::replace(&mut self.system_prompt, system_prompt.into());
        debug!(discarded = messages.len(), "conversation restarted for this turn");
        let mut turn = self.begin_turn(message);
        turn.replaced = Some((messages, prompt));
        turn
    }

    fn restore_front(&mut self, evicted: Vec<Message>) {
        for message in evicted.into_iter().rev() {
            self.messages.push_front(message);
        }
    }
}

/// A user message awaiting its reply.
pub struct PendingTurn<'a> {
    session: &'a mut ConversationSession,
    prior: Vec<Message>,
    evicted: Vec<Message>,
    /// Conversation and prompt in place before a restart made for this turn.
    replaced: Option<(VecDeque<Message>, String)>,
    committed: bool,
}

impl PendingTurn<'_> {
    /// History as it stood before this turn's user message.
    pub fn prior_history(&self) -> &[Message] {
        &self.prior
    }

    pub fn commit(mut self, reply: impl Into<String>) {
        self.session.add_message(Role::Assistant, reply);
        self.committed = true;
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Some((messages, prompt)) = self.replaced.take() {
            self.session.messages = messages;
            self.session.system_prompt = prompt;
            debug!(len = self.session.len(), "failed turn undid the restart");
            return;
        }
        if self.session.rollback_last_user_message() {
            let evicted = std::mem::take(&mut self.evicted);
            self.session.restore_front(evicted);
            debug!(len = self.session.len(), "rolled back unanswered user message");
        }
    }
}
