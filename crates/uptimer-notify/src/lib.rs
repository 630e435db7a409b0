//! uptimer-notify: turning confirmed status changes into chat messages.
//!
//! - [`Alert`] renders the human-readable text for an outage or recovery.
//! - [`Notifier`] is the delivery seam the scheduler depends on.
//! - [`WebhookNotifier`] posts messages to chat webhooks (Discord-style
//!   `{"content": ...}` payloads), resolving each [`ChannelRef`] to a URL.
//!
//! Delivery is attempted once. Callers log failures and move on.

pub mod alert;
pub mod sender;
pub mod webhook;

pub use alert::{Alert, AlertKind};
pub use sender::{ChannelRef, Notifier, NotifyError};
pub use webhook::WebhookNotifier;
