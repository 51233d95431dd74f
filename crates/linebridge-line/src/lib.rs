//! linebridge-line — LINE Messaging API plumbing: webhook payloads, signature
//! checks, the reply/push client and segmented sending.

pub mod allow;
pub mod client;
pub mod error;
pub mod send;
pub mod signature;
pub mod types;

pub use client::{LineClient, MessageGateway};
pub use error::LineError;
pub use types::{IncomingText, TextMessage, WebhookEvent, WebhookPayload};
