//! Single-user gate for incoming webhook events.
//!
//! The bridge drives a shell-capable assistant, so only one configured LINE
//! user may talk to it. An empty configured ID matches nobody.

use crate::types::WebhookEvent;

/// Returns `true` when the event was sent by the authorized user.
pub fn is_allowed(authorized_user_id: &str, event: &WebhookEvent) -> bool {
    if authorized_user_id.is_empty() {
        return false;
    }
    event.source_user_id() == Some(authorized_user_id)
}
