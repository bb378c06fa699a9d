//! In-memory stand-ins for the alarm collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::error::{AlarmError, NotifyError};
use super::notification::NotificationPresenter;
use super::permission::ExactAlarmAccess;
use super::service::AlarmService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Exact { at: i64 },
    Repeating { at: i64, interval: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Set(i64),
    Cancel(i64),
}

/// Keeps registrations in a map and logs every call in order.
#[derive(Default)]
pub struct RecordingAlarms {
    live: Mutex<HashMap<i64, (Recorded, Vec<u8>)>>,
    calls: Mutex<Vec<Call>>,
    fail: AtomicBool,
}

impl RecordingAlarms {
    pub fn live(&self, id: i64) -> Option<Recorded> {
        self.live.lock().unwrap().get(&id).map(|(r, _)| r.clone())
    }

    pub fn payload(&self, id: i64) -> Option<Vec<u8>> {
        self.live.lock().unwrap().get(&id).map(|(_, p)| p.clone())
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every following `set_*` fail.
    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn set(&self, id: i64, recorded: Recorded, payload: Vec<u8>) -> Result<(), AlarmError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AlarmError::NoRuntime);
        }
        self.calls.lock().unwrap().push(Call::Set(id));
        let previous = self.live.lock().unwrap().insert(id, (recorded, payload));
        assert!(previous.is_none(), "alarm {} set twice without cancel", id);
        Ok(())
    }
}

impl AlarmService for RecordingAlarms {
    fn set_exact(&self, id: i64, trigger_at_ms: i64, payload: Vec<u8>) -> Result<(), AlarmError> {
        self.set(id, Recorded::Exact { at: trigger_at_ms }, payload)
    }

    fn set_repeating(
        &self,
        id: i64,
        trigger_at_ms: i64,
        interval: Duration,
        payload: Vec<u8>,
    ) -> Result<(), AlarmError> {
        self.set(
            id,
            Recorded::Repeating {
                at: trigger_at_ms,
                interval,
            },
            payload,
        )
    }

    fn cancel(&self, id: i64) -> bool {
        self.calls.lock().unwrap().push(Call::Cancel(id));
        self.live.lock().unwrap().remove(&id).is_some()
    }

    fn is_scheduled(&self, id: i64) -> bool {
        self.live.lock().unwrap().contains_key(&id)
    }
}

pub struct SwitchAccess(AtomicBool);

impl SwitchAccess {
    pub fn new(granted: bool) -> Self {
        Self(AtomicBool::new(granted))
    }

    pub fn set(&self, granted: bool) {
        self.0.store(granted, Ordering::SeqCst);
    }
}

impl ExactAlarmAccess for SwitchAccess {
    fn can_schedule_exact(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    shown: Mutex<Vec<(String, String)>>,
}

impl RecordingPresenter {
    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap().clone()
    }
}

impl NotificationPresenter for RecordingPresenter {
    fn show(&self, title: &str, message: &str) -> Result<u32, NotifyError> {
        let mut shown = self.shown.lock().unwrap();
        shown.push((title.to_string(), message.to_string()));
        Ok(shown.len() as u32)
    }
}
