use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alarm::model::WeekdayToken;

pub const ACTION_TYPE_ID: &str = "ALARM_ACTIONS";
pub const ACTION_SNOOZE: &str = "snooze";
pub const ACTION_DISMISS: &str = "dismiss";

pub const ALARM_ACTIONS: [NotificationAction; 2] = [
    NotificationAction {
        id: ACTION_SNOOZE,
        title: "Snooze",
        destructive: false,
    },
    NotificationAction {
        id: ACTION_DISMISS,
        title: "Dismiss",
        destructive: true,
    },
];

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to access pending notification storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("pending notification data is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("backend rejected notification {0}")]
    Rejected(NotificationId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionState {
    #[default]
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy)]
pub struct NotificationAction {
    pub id: &'static str,
    pub title: &'static str,
    pub destructive: bool,
}

/// One of the three notification categories an alarm can own. For a
/// given alarm the nine possible values (primary, seven weekdays,
/// snooze) never collide, and a snooze instance is distinguishable from
/// the recurring series it interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Primary,
    Weekly(WeekdayToken),
    Snooze,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId {
    pub alarm_id: String,
    pub kind: NotificationKind,
}

impl NotificationId {
    pub fn snooze(alarm_id: &str) -> Self {
        Self {
            alarm_id: alarm_id.to_string(),
            kind: NotificationKind::Snooze,
        }
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            NotificationKind::Primary => write!(f, "{}:primary", self.alarm_id),
            NotificationKind::Weekly(day) => write!(f, "{}:weekly-{}", self.alarm_id, day),
            NotificationKind::Snooze => write!(f, "{}:snooze", self.alarm_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatEvery {
    Week,
}

/// The extra bag carried by every notification; cancellation filters on
/// the alarm id recorded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub alarm_id: String,
    pub volume: u8,
    pub vibration: bool,
    pub snooze: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
    pub at: DateTime<Local>,
    pub repeats: bool,
    pub every: Option<RepeatEvery>,
    pub sound: String,
    pub action_type_id: String,
    pub payload: NotificationPayload,
}

/// Seam to the platform notification subsystem. The reconciler is the
/// only caller that mutates the pending set.
pub trait NotificationBackend {
    fn request_permission(&mut self) -> Result<PermissionState, NotifyError>;
    fn register_actions(
        &mut self,
        type_id: &str,
        actions: &[NotificationAction],
    ) -> Result<(), NotifyError>;
    fn schedule(&mut self, request: NotificationRequest) -> Result<(), NotifyError>;
    fn pending(&self) -> Result<Vec<NotificationRequest>, NotifyError>;
    fn cancel(&mut self, ids: &[NotificationId]) -> Result<(), NotifyError>;
}

/// Pending set persisted as a JSON file, standing in for the OS
/// notification registry between CLI runs.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<Vec<NotificationRequest>, NotifyError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&self, pending: &[NotificationRequest]) -> Result<(), NotifyError> {
        let text = serde_json::to_string_pretty(pending)?;
        fs::write(&self.path, format!("{text}\n"))?;
        Ok(())
    }
}

impl NotificationBackend for FileBackend {
    fn request_permission(&mut self) -> Result<PermissionState, NotifyError> {
        // No permission prompt outside the mobile shell; a pending file
        // we cannot place anywhere is the one way delivery is impossible.
        let writable = self.path.parent().map(Path::exists).unwrap_or(false);
        Ok(if writable {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        })
    }

    fn register_actions(
        &mut self,
        type_id: &str,
        actions: &[NotificationAction],
    ) -> Result<(), NotifyError> {
        for action in actions {
            log::debug!(
                "registered notification action. [type_id = {type_id}, id = {}, title = {}, destructive = {}]",
                action.id,
                action.title,
                action.destructive
            );
        }
        Ok(())
    }

    fn schedule(&mut self, request: NotificationRequest) -> Result<(), NotifyError> {
        let mut pending = self.load()?;
        // Scheduling an id that is already pending replaces it.
        pending.retain(|existing| existing.id != request.id);
        pending.push(request);
        self.save(&pending)
    }

    fn pending(&self) -> Result<Vec<NotificationRequest>, NotifyError> {
        self.load()
    }

    fn cancel(&mut self, ids: &[NotificationId]) -> Result<(), NotifyError> {
        let mut pending = self.load()?;
        pending.retain(|existing| !ids.contains(&existing.id));
        self.save(&pending)
    }
}

/// In-memory backend with injectable permission state and per-id
/// scheduling rejection.
#[derive(Default)]
pub struct MemoryBackend {
    pub permission: PermissionState,
    pub reject: HashSet<NotificationId>,
    pending: Vec<NotificationRequest>,
}

impl NotificationBackend for MemoryBackend {
    fn request_permission(&mut self) -> Result<PermissionState, NotifyError> {
        Ok(self.permission)
    }

    fn register_actions(
        &mut self,
        _type_id: &str,
        _actions: &[NotificationAction],
    ) -> Result<(), NotifyError> {
        Ok(())
    }

    fn schedule(&mut self, request: NotificationRequest) -> Result<(), NotifyError> {
        if self.reject.contains(&request.id) {
            return Err(NotifyError::Rejected(request.id));
        }
        self.pending.retain(|existing| existing.id != request.id);
        self.pending.push(request);
        Ok(())
    }

    fn pending(&self) -> Result<Vec<NotificationRequest>, NotifyError> {
        Ok(self.pending.clone())
    }

    fn cancel(&mut self, ids: &[NotificationId]) -> Result<(), NotifyError> {
        self.pending.retain(|existing| !ids.contains(&existing.id));
        Ok(())
    }
}
