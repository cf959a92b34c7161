//! Due-date reminders
//!
//! At most one pending reminder per record: the day before the due date at
//! a fixed local wall-clock time. The fire time is resolved in a real time
//! zone, so it stays on that wall-clock time across DST changes. Delivery
//! goes through a [`NotificationCenter`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};

use crate::error::{Error, Result};
use crate::models::{Record, RecordId};

pub const REMINDER_TITLE: &str = "Test due tomorrow!";

/// One-shot, time-triggered alert keyed by record id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub id: RecordId,
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Utc>,
}

/// Local notification delivery.
pub trait NotificationCenter: Send + Sync {
    /// Register a request, replacing any pending one with the same id.
    fn add(&self, request: NotificationRequest) -> Result<()>;

    /// Drop pending requests. Unknown ids are ignored.
    fn remove_pending(&self, ids: &[RecordId]);
}

impl<T: NotificationCenter + ?Sized> NotificationCenter for Arc<T> {
    fn add(&self, request: NotificationRequest) -> Result<()> {
        (**self).add(request)
    }

    fn remove_pending(&self, ids: &[RecordId]) {
        (**self).remove_pending(ids);
    }
}

/// Notification center that keeps requests in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotificationCenter {
    pending: Arc<Mutex<BTreeMap<RecordId, NotificationRequest>>>,
}

impl MemoryNotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Vec<NotificationRequest> {
        self.lock().values().cloned().collect()
    }

    pub fn get(&self, id: &RecordId) -> Option<NotificationRequest> {
        self.lock().get(id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<RecordId, NotificationRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NotificationCenter for MemoryNotificationCenter {
    fn add(&self, request: NotificationRequest) -> Result<()> {
        if request.title.is_empty() {
            return Err(Error::Notification(
                "Notification title cannot be empty".to_string(),
            ));
        }
        self.lock().insert(request.id.clone(), request);
        Ok(())
    }

    fn remove_pending(&self, ids: &[RecordId]) {
        let mut pending = self.lock();
        for id in ids {
            pending.remove(id);
        }
    }
}

/// Compute when the reminder for `due_date` fires: the previous calendar
/// day in `timezone`, at `hour:minute` wall-clock time.
///
/// A time repeated by a backward shift resolves to its first occurrence; a
/// time skipped by a forward shift moves one hour later.
pub fn reminder_fire_time<Tz: TimeZone>(
    due_date: DateTime<Utc>,
    timezone: &Tz,
    hour: u32,
    minute: u32,
) -> Option<DateTime<Utc>> {
    let day_before = due_date.with_timezone(timezone).date_naive().pred_opt()?;
    let local = day_before.and_hms_opt(hour, minute, 0)?;
    timezone
        .from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            timezone
                .from_local_datetime(&(local + Duration::hours(1)))
                .earliest()
        })
        .map(|fire_at| fire_at.with_timezone(&Utc))
}

/// Maintains one reminder per record with a due date.
pub struct NotificationScheduler<N, Tz = Local> {
    center: N,
    timezone: Tz,
    hour: u32,
    minute: u32,
    scheduled: BTreeSet<RecordId>,
}

impl<N: NotificationCenter> NotificationScheduler<N> {
    /// Scheduler firing at 09:00 in the system's time zone.
    pub fn new(center: N) -> Self {
        Self::with_timezone(center, Local)
    }
}

impl<N: NotificationCenter, Tz: TimeZone> NotificationScheduler<N, Tz> {
    pub fn with_timezone(center: N, timezone: Tz) -> Self {
        Self {
            center,
            timezone,
            hour: 9,
            minute: 0,
            scheduled: BTreeSet::new(),
        }
    }

    /// Change the local time of day reminders fire at. Out-of-range values
    /// are rejected.
    pub fn set_reminder_time(&mut self, hour: u32, minute: u32) -> Result<()> {
        if hour > 23 || minute > 59 {
            return Err(Error::InvalidInput(format!(
                "Invalid reminder time {hour:02}:{minute:02}"
            )));
        }
        self.hour = hour;
        self.minute = minute;
        Ok(())
    }

    pub const fn center(&self) -> &N {
        &self.center
    }

    /// Schedule the reminder for `record`, see [`Self::schedule_at`].
    pub fn schedule(&mut self, record: &Record) -> Result<Option<DateTime<Utc>>> {
        self.schedule_at(record, Utc::now())
    }

    /// Replace the reminder for `record` as of `now`.
    ///
    /// Any previous reminder for the record is cancelled first. Nothing is
    /// scheduled when the record has no due date or the fire time is not
    /// strictly after `now`. Returns the fire time that was registered.
    pub fn schedule_at(
        &mut self,
        record: &Record,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        self.cancel(&record.id);

        let Some(due_date) = record.due_date else {
            return Ok(None);
        };
        let Some(fire_at) = reminder_fire_time(due_date, &self.timezone, self.hour, self.minute)
        else {
            return Ok(None);
        };
        if fire_at <= now {
            tracing::debug!("Reminder for {} skipped, {fire_at} is past", record.id);
            return Ok(None);
        }

        self.center.add(NotificationRequest {
            id: record.id.clone(),
            title: REMINDER_TITLE.to_string(),
            body: format!("{} - {}", record.name, record.brand),
            fire_at,
        })?;
        self.scheduled.insert(record.id.clone());
        tracing::debug!("Reminder for {} scheduled at {fire_at}", record.id);
        Ok(Some(fire_at))
    }

    /// Remove the pending reminder for `id`, if any.
    pub fn cancel(&mut self, id: &RecordId) {
        self.scheduled.remove(id);
        self.center.remove_pending(std::slice::from_ref(id));
    }

    /// Cancel every reminder scheduled through this scheduler.
    pub fn cancel_all(&mut self) {
        if self.scheduled.is_empty() {
            return;
        }
        let ids: Vec<RecordId> = std::mem::take(&mut self.scheduled).into_iter().collect();
        self.center.remove_pending(&ids);
        tracing::debug!("Cancelled {} reminders", ids.len());
    }

    pub fn pending_ids(&self) -> impl Iterator<Item = &RecordId> {
        self.scheduled.iter()
    }
}
