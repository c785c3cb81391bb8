use parking_lot::Mutex;

use crate::model::{ClearAck, ConversationTurn, Role};

/// In-memory, append-only conversation log shared by all requests.
///
/// Every operation takes the lock for its whole duration, so concurrent
/// appends keep a single consistent order. Nothing is written to disk.
#[derive(Debug, Default)]
pub struct ConversationStore {
    turns: Mutex<Vec<ConversationTurn>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, role: Role, content: impl Into<String>) {
        self.turns.lock().push(ConversationTurn::new(role, content));
    }

    /// Copy of the log in append order.
    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.turns.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.lock().is_empty()
    }

    pub fn clear(&self) -> ClearAck {
        self.turns.lock().clear();
        ClearAck {
            status: "success".to_string(),
            message: "Memory history cleared".to_string(),
        }
    }
}
