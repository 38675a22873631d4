pub mod bootstrap;
pub mod conversation;

pub use bootstrap::SessionBootstrap;
pub use conversation::{
    ConversationClient, ConversationPhase, ConversationSnapshot, HistoryOutcome, SendOutcome,
};
