//! Mediates between the screen, the store and the scheduler.
//!
//! Every user action persists first and then (re)schedules or cancels the
//! matching alarm, keeping at most one live alarm per reminder id. A one-shot
//! reminder that cannot be scheduled for lack of the precise-timing
//! capability is parked in a single pending slot until the user answers the
//! permission prompt.

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::alarm::{ReminderScheduler, ScheduleError};
use crate::reminder::error::Result;
use crate::reminder::{NewReminder, Reminder, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptState {
    #[default]
    NotNeeded,
    /// The screen should send the user to the permission settings.
    Needed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionOutcome {
    #[default]
    Unset,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionState {
    pub prompt: PromptState,
    pub outcome: PermissionOutcome,
}

/// Work queued for the view-model task.
#[derive(Debug, Clone)]
pub enum Action {
    Insert(NewReminder),
    Update(Reminder),
    Delete(Reminder),
    RearmAll,
    PromptHandled,
    PermissionGranted,
    PermissionDenied,
    ClearOutcome,
}

/// What the screen watches.
pub struct Observers {
    pub reminders: watch::Receiver<Vec<Reminder>>,
    pub permission: watch::Receiver<PermissionState>,
    /// One-off messages for the status bar.
    pub messages: mpsc::UnboundedReceiver<String>,
}

pub struct ReminderViewModel {
    store: Store,
    scheduler: ReminderScheduler,
    permission: watch::Sender<PermissionState>,
    messages: mpsc::UnboundedSender<String>,
    pending: Option<Reminder>,
}

impl ReminderViewModel {
    pub fn new(store: Store, scheduler: ReminderScheduler) -> (Self, Observers) {
        let (permission, permission_rx) = watch::channel(PermissionState::default());
        let (messages, messages_rx) = mpsc::unbounded_channel();
        let observers = Observers {
            reminders: store.subscribe(),
            permission: permission_rx,
            messages: messages_rx,
        };

        let vm = Self {
            store,
            scheduler,
            permission,
            messages,
            pending: None,
        };
        (vm, observers)
    }

    #[cfg(test)]
    pub fn pending(&self) -> Option<&Reminder> {
        self.pending.as_ref()
    }

    #[cfg(test)]
    pub fn permission_state(&self) -> PermissionState {
        *self.permission.borrow()
    }

    pub fn insert_reminder(&mut self, new: NewReminder) -> Result<Reminder> {
        let id = self.store.insert(&Reminder::from_new(0, new.clone()))?;
        let reminder = Reminder::from_new(id, new);
        debug!("New reminder created with id {}", id);
        self.schedule_internal(reminder.clone());
        Ok(reminder)
    }

    pub fn update_reminder(&mut self, reminder: Reminder) -> Result<()> {
        self.store.update(&reminder)?;
        self.scheduler.cancel(&reminder);
        debug!("Old alarm for reminder {} cancelled, rescheduling", reminder.id);
        self.schedule_internal(reminder);
        Ok(())
    }

    pub fn delete_reminder(&mut self, reminder: Reminder) -> Result<()> {
        self.store.delete(&reminder)?;
        self.scheduler.cancel(&reminder);
        if self.pending.as_ref().map(|p| p.id) == Some(reminder.id) {
            self.pending = None;
        }
        info!("Reminder {} deleted and alarm cancelled", reminder.id);
        Ok(())
    }

    /// Set alarms for everything in the store. Alarms live in this process,
    /// so this runs on every start. One-shots already in the past are skipped.
    pub fn rearm_all(&mut self) -> Result<usize> {
        let now = Utc::now().timestamp_millis();
        let mut armed = 0;
        for reminder in self.store.all()? {
            if !reminder.repeat_mode.is_repeating() && reminder.start_time <= now {
                debug!("Skipping expired one-shot reminder {}", reminder.id);
                continue;
            }
            if self.schedule_internal(reminder) {
                armed += 1;
            }
        }
        info!("Re-armed {} reminder(s)", armed);
        Ok(armed)
    }

    /// The screen has shown the permission prompt. The answer comes later.
    pub fn on_prompt_handled(&mut self) {
        debug!("Exact alarm permission prompt shown");
        self.permission
            .send_modify(|s| s.prompt = PromptState::NotNeeded);
    }

    pub fn on_permission_granted(&mut self) {
        info!("Exact alarm permission granted");
        self.permission
            .send_modify(|s| s.outcome = PermissionOutcome::Granted);
        if let Some(reminder) = self.pending.take() {
            info!("Retrying pending reminder {}", reminder.id);
            self.schedule_internal(reminder);
        }
    }

    pub fn on_permission_denied(&mut self) {
        warn!("Exact alarm permission denied");
        self.permission
            .send_modify(|s| s.outcome = PermissionOutcome::Denied);
        if let Some(reminder) = self.pending.take() {
            debug!("Dropping pending reminder {}", reminder.id);
        }
    }

    pub fn clear_outcome(&mut self) {
        self.permission
            .send_modify(|s| s.outcome = PermissionOutcome::Unset);
    }

    /// Returns true when the alarm was set.
    fn schedule_internal(&mut self, reminder: Reminder) -> bool {
        match self.scheduler.schedule(&reminder) {
            Ok(()) => {
                self.pending = None;
                true
            }
            Err(e @ ScheduleError::ExactAlarmPermission) => {
                warn!(
                    "Reminder {} needs the exact alarm permission",
                    reminder.id
                );
                self.notify(e.to_string());
                self.pending = Some(reminder);
                self.permission
                    .send_modify(|s| s.prompt = PromptState::Needed);
                false
            }
            Err(e @ ScheduleError::Alarm(_)) => {
                // Stays in the store, unscheduled. No retry.
                self.notify(e.to_string());
                self.pending = None;
                false
            }
        }
    }

    fn notify(&self, message: String) {
        // The screen may already be gone on shutdown.
        let _ = self.messages.send(message);
    }

    pub fn apply(&mut self, action: Action) {
        let result = match action {
            Action::Insert(new) => self.insert_reminder(new).map(|_| ()),
            Action::Update(reminder) => self.update_reminder(reminder),
            Action::Delete(reminder) => self.delete_reminder(reminder),
            Action::RearmAll => self.rearm_all().map(|_| ()),
            Action::PromptHandled => {
                self.on_prompt_handled();
                Ok(())
            }
            Action::PermissionGranted => {
                self.on_permission_granted();
                Ok(())
            }
            Action::PermissionDenied => {
                self.on_permission_denied();
                Ok(())
            }
            Action::ClearOutcome => {
                self.clear_outcome();
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("Reminder store operation failed: {}", e);
            self.notify(format!("Could not save reminder: {}", e));
        }
    }

    /// Move the view-model onto its own task. Actions run one at a time in
    /// the order they were dispatched.
    pub fn spawn(mut self) -> (ViewModelHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            while let Some(action) = rx.recv().await {
                self.apply(action);
            }
            debug!("View-model task finished");
        });
        (ViewModelHandle { tx }, task)
    }
}

/// Cheap, cloneable way for the screen to queue actions.
#[derive(Clone)]
pub struct ViewModelHandle {
    tx: mpsc::UnboundedSender<Action>,
}

impl ViewModelHandle {
    pub fn dispatch(&self, action: Action) {
        if self.tx.send(action).is_err() {
            warn!("View-model task has stopped, action dropped");
        }
    }

    /// A handle with no task behind it; actions land in the returned queue.
    #[cfg(test)]
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::alarm::testing::{Call, RecordingAlarms, SwitchAccess};
    use crate::alarm::AlarmService;
    use crate::reminder::RepeatMode;

    struct Harness {
        vm: ReminderViewModel,
        observers: Observers,
        alarms: Arc<RecordingAlarms>,
        access: Arc<SwitchAccess>,
    }

    fn harness(granted: bool) -> Harness {
        let alarms = Arc::new(RecordingAlarms::default());
        let access = Arc::new(SwitchAccess::new(granted));
        let scheduler = ReminderScheduler::new(alarms.clone(), access.clone());
        let (vm, observers) = ReminderViewModel::new(Store::open_in_memory().unwrap(), scheduler);
        Harness {
            vm,
            observers,
            alarms,
            access,
        }
    }

    fn future_ms() -> i64 {
        Utc::now().timestamp_millis() + 3_600_000
    }

    fn once(title: &str) -> NewReminder {
        NewReminder::new(title, future_ms())
    }

    #[test]
    fn test_insert_schedules_with_store_id() {
        let mut h = harness(true);
        let reminder = h.vm.insert_reminder(once("Dentist")).unwrap();
        assert!(reminder.id > 0);
        assert!(h.alarms.is_scheduled(reminder.id));
        assert_eq!(h.observers.reminders.borrow().len(), 1);
        assert!(h.vm.pending().is_none());
    }

    #[test]
    fn test_denied_permission_parks_reminder() {
        let mut h = harness(false);
        let reminder = h.vm.insert_reminder(once("Dentist")).unwrap();

        assert_eq!(h.alarms.live_count(), 0);
        assert_eq!(h.vm.pending(), Some(&reminder));
        assert_eq!(h.vm.permission_state().prompt, PromptState::Needed);
        // still persisted
        assert_eq!(h.observers.reminders.borrow().len(), 1);
        assert_eq!(
            h.observers.messages.try_recv().unwrap(),
            "Exact alarm permission needed. Please grant it in settings."
        );
    }

    #[test]
    fn test_grant_retries_exactly_the_pending_reminder() {
        let mut h = harness(false);
        let scheduled = h
            .vm
            .insert_reminder(once("Daily walk").repeat(RepeatMode::Daily))
            .unwrap();
        let parked = h.vm.insert_reminder(once("Dentist")).unwrap();

        h.vm.on_prompt_handled();
        assert_eq!(h.vm.permission_state().prompt, PromptState::NotNeeded);
        assert_eq!(h.vm.permission_state().outcome, PermissionOutcome::Unset);

        h.access.set(true);
        h.vm.on_permission_granted();

        assert_eq!(h.vm.permission_state().outcome, PermissionOutcome::Granted);
        assert!(h.vm.pending().is_none());
        assert!(h.alarms.is_scheduled(parked.id));
        assert!(h.alarms.is_scheduled(scheduled.id));
        assert_eq!(
            h.alarms.calls(),
            vec![Call::Set(scheduled.id), Call::Set(parked.id)]
        );

        h.vm.clear_outcome();
        assert_eq!(h.vm.permission_state(), PermissionState::default());
    }

    #[test]
    fn test_denial_discards_pending() {
        let mut h = harness(false);
        let parked = h.vm.insert_reminder(once("Dentist")).unwrap();

        h.vm.on_prompt_handled();
        h.vm.on_permission_denied();

        assert_eq!(h.vm.permission_state().outcome, PermissionOutcome::Denied);
        assert!(h.vm.pending().is_none());
        assert!(!h.alarms.is_scheduled(parked.id));

        // a later grant has nothing to retry
        h.vm.on_permission_granted();
        assert_eq!(h.alarms.live_count(), 0);
    }

    #[test]
    fn test_update_cancels_before_rescheduling() {
        let mut h = harness(true);
        let mut reminder = h.vm.insert_reminder(once("Standup")).unwrap();

        reminder.title = "Standup (moved)".to_string();
        reminder.repeat_mode = RepeatMode::Weekly;
        h.vm.update_reminder(reminder.clone()).unwrap();

        assert_eq!(
            h.alarms.calls(),
            vec![
                Call::Set(reminder.id),
                Call::Cancel(reminder.id),
                Call::Set(reminder.id)
            ]
        );
        assert_eq!(h.alarms.live_count(), 1);
        let payload = crate::alarm::AlarmPayload::decode(&h.alarms.payload(reminder.id).unwrap());
        assert_eq!(payload.title, "Standup (moved)");
    }

    #[test]
    fn test_delete_cancels_and_second_cancel_is_noop() {
        let mut h = harness(true);
        let reminder = h.vm.insert_reminder(once("Bins")).unwrap();

        h.vm.delete_reminder(reminder.clone()).unwrap();
        assert_eq!(h.alarms.live_count(), 0);
        assert!(h.observers.reminders.borrow().is_empty());

        h.vm.delete_reminder(reminder.clone()).unwrap();
        assert_eq!(
            h.alarms.calls(),
            vec![
                Call::Set(reminder.id),
                Call::Cancel(reminder.id),
                Call::Cancel(reminder.id)
            ]
        );
    }

    #[test]
    fn test_deleting_pending_reminder_clears_slot() {
        let mut h = harness(false);
        let parked = h.vm.insert_reminder(once("Dentist")).unwrap();
        h.vm.delete_reminder(parked).unwrap();
        assert!(h.vm.pending().is_none());
    }

    #[test]
    fn test_alarm_failure_leaves_reminder_unscheduled() {
        let mut h = harness(true);
        h.alarms.fail_next(true);
        let reminder = h.vm.insert_reminder(once("Flaky")).unwrap();

        assert!(!h.alarms.is_scheduled(reminder.id));
        assert!(h.vm.pending().is_none());
        assert_eq!(h.vm.permission_state().prompt, PromptState::NotNeeded);
        assert_eq!(h.observers.reminders.borrow().len(), 1);
        assert_eq!(
            h.observers.messages.try_recv().unwrap(),
            "Error setting alarm."
        );
    }

    #[test]
    fn test_rearm_skips_expired_one_shots() {
        let mut h = harness(true);
        let past = Utc::now().timestamp_millis() - 60_000;
        let expired = h.vm.insert_reminder(NewReminder::new("old", past)).unwrap();
        let daily = h
            .vm
            .insert_reminder(NewReminder::new("daily", past).repeat(RepeatMode::Daily))
            .unwrap();
        let upcoming = h.vm.insert_reminder(once("upcoming")).unwrap();

        // fresh process: the service starts empty
        let alarms = Arc::new(RecordingAlarms::default());
        let scheduler = ReminderScheduler::new(alarms.clone(), h.access.clone());
        let store = std::mem::replace(&mut h.vm.store, Store::open_in_memory().unwrap());
        let (mut vm, _observers) = ReminderViewModel::new(store, scheduler);

        assert_eq!(vm.rearm_all().unwrap(), 2);
        assert!(!alarms.is_scheduled(expired.id));
        assert!(alarms.is_scheduled(daily.id));
        assert!(alarms.is_scheduled(upcoming.id));
    }

    #[test]
    fn test_store_error_becomes_message() {
        let mut h = harness(true);
        let mut ghost = Reminder::from_new(0, once("ghost"));
        ghost.id = 77;
        h.vm.apply(Action::Update(ghost));
        let message = h.observers.messages.try_recv().unwrap();
        assert!(message.starts_with("Could not save reminder"));
        assert_eq!(h.alarms.live_count(), 0);
    }

    #[tokio::test]
    async fn test_actions_run_in_order_on_task() {
        let h = harness(true);
        let mut reminders = h.observers.reminders.clone();
        let (handle, task) = h.vm.spawn();

        handle.dispatch(Action::Insert(once("first")));
        handle.dispatch(Action::Insert(once("second")));

        while reminders.borrow_and_update().len() < 2 {
            reminders.changed().await.unwrap();
        }
        let titles: Vec<String> = reminders.borrow().iter().map(|r| r.title.clone()).collect();
        assert_eq!(titles, vec!["first", "second"]);

        drop(handle);
        task.await.unwrap();
        assert_eq!(h.alarms.live_count(), 2);
    }
}
