use std::time::Duration;

use super::GenerationError;

/// Progress notifications sent by a running [`Generator`](super::Generator).
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    Started,
    /// A stage finished; `elapsed` is measured from `Started`.
    Progress { message: String, elapsed: Duration },
    Completed { elapsed: Duration },
    Failed { error: GenerationError },
}

impl GenerationEvent {
    /// True for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationEvent::Completed { .. } | GenerationEvent::Failed { .. })
    }
}
