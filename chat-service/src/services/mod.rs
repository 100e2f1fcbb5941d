pub mod conversation;
pub mod metrics;
pub mod providers;
pub mod session_backend;
pub mod session_store;
pub mod transcript;

pub use conversation::{ConversationError, ConversationService, Reply};
pub use metrics::{get_metrics, init_metrics};
pub use session_backend::ExpiringMemoryStore;
pub use session_store::{InMemorySession, SessionStore, SessionStoreError};
pub use transcript::TranscriptLog;
