pub mod coordinator;
pub mod event;
pub mod state;
pub mod stats;
pub mod transport;

pub use coordinator::SessionCoordinator;
pub use event::{AnswerFrame, SessionEvent};
pub use state::{ConversationMessage, InterviewState, MessageGroup};
pub use stats::SessionStats;
pub use transport::{SessionSettings, SessionSignal, SessionTransport};
