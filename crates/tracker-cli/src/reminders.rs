//! Reminder delivery for the terminal.
//!
//! A one-shot process cannot fire reminders later, so requests are logged
//! and kept in memory for the rest of the invocation.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracker_core::notify::{NotificationCenter, NotificationRequest};
use tracker_core::RecordId;

#[derive(Debug, Clone, Default)]
pub struct LogNotificationCenter {
    pending: Arc<Mutex<BTreeMap<RecordId, NotificationRequest>>>,
}

impl LogNotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<RecordId, NotificationRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NotificationCenter for LogNotificationCenter {
    fn add(&self, request: NotificationRequest) -> tracker_core::Result<()> {
        tracing::info!(
            "Reminder for {} at {}: {}",
            request.id,
            request.fire_at.format("%Y-%m-%d %H:%M UTC"),
            request.body
        );
        self.lock().insert(request.id.clone(), request);
        Ok(())
    }

    fn remove_pending(&self, ids: &[RecordId]) {
        let mut pending = self.lock();
        for id in ids {
            if pending.remove(id).is_some() {
                tracing::debug!("Reminder for {id} cancelled");
            }
        }
    }
}
