pub mod sessions;
pub mod tools;

pub use sessions::{
    anthropic_factory, MergeResult, NextPrompt, ServiceFactory, SessionCreated, SessionRequest,
    SessionService, StoredSession,
};
pub use tools::LocaleFillServer;
