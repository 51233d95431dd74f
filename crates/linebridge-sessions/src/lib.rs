pub mod registry;
pub mod types;

pub use registry::{AssistantFactory, SessionRegistry};
pub use types::Session;
