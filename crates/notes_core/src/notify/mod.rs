//! Note-created notification collaborator.
//!
//! # Responsibility
//! - Turn a `NoteCreated` event into a host notification request.
//! - Parse the host-reported notification permission state.
//!
//! # Invariants
//! - `NoteCreated` is emitted unconditionally; permission only decides
//!   whether a request is built from it.
//! - Delivery is fire-and-forget: the core never learns whether the host
//!   actually showed anything.

use crate::service::note_service::NoteCreated;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Notification channel id registered by the host.
pub const NOTES_CHANNEL_ID: &str = "notes_channel";
const TITLE_PREFIX: &str = "New note: ";

pub const PERMISSION_GRANTED: &str = "granted";
pub const PERMISSION_DENIED: &str = "denied";
pub const PERMISSION_NOT_REQUIRED: &str = "not_required";

/// Host platform permission state for posting notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// Platform does not gate notifications behind a runtime permission.
    NotRequired,
}

impl NotificationPermission {
    pub fn allows_posting(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

/// Permission string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationPermissionError {
    Empty,
    Unsupported(String),
}

impl Display for NotificationPermissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "notification permission value must not be empty"),
            Self::Unsupported(value) => {
                write!(f, "notification permission is unsupported: {value}")
            }
        }
    }
}

impl Error for NotificationPermissionError {}

/// Parses `granted|denied|not_required`.
pub fn parse_notification_permission(
    value: &str,
) -> Result<NotificationPermission, NotificationPermissionError> {
    match value.trim() {
        "" => Err(NotificationPermissionError::Empty),
        PERMISSION_GRANTED => Ok(NotificationPermission::Granted),
        PERMISSION_DENIED => Ok(NotificationPermission::Denied),
        PERMISSION_NOT_REQUIRED => Ok(NotificationPermission::NotRequired),
        other => Err(NotificationPermissionError::Unsupported(other.to_string())),
    }
}

/// Notification the host should post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub channel_id: &'static str,
    pub title: String,
    pub text: String,
}

/// Builds the notification for a created note, `None` when not permitted.
pub fn build_notification(
    event: &NoteCreated,
    permission: NotificationPermission,
) -> Option<NotificationRequest> {
    if !permission.allows_posting() {
        info!("event=note_notify module=notify status=skipped reason=permission_denied");
        return None;
    }

    Some(NotificationRequest {
        channel_id: NOTES_CHANNEL_ID,
        title: format!("{TITLE_PREFIX}{}", event.title),
        text: event.content.clone(),
    })
}
