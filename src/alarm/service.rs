use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::error::AlarmError;
use super::receiver::AlarmReceiver;

/// Registry of timed triggers keyed by reminder id.
///
/// Setting an alarm for an id that already has one replaces it.
pub trait AlarmService: Send + Sync {
    /// Fire once at `trigger_at_ms` (epoch milliseconds).
    fn set_exact(&self, id: i64, trigger_at_ms: i64, payload: Vec<u8>) -> Result<(), AlarmError>;

    /// Fire at `trigger_at_ms` and then every `interval`.
    fn set_repeating(
        &self,
        id: i64,
        trigger_at_ms: i64,
        interval: Duration,
        payload: Vec<u8>,
    ) -> Result<(), AlarmError>;

    /// Remove the alarm for `id`. Returns false when there was none.
    fn cancel(&self, id: i64) -> bool;

    fn is_scheduled(&self, id: i64) -> bool;
}

struct Registration {
    generation: u64,
    task: JoinHandle<()>,
}

type Registry = Arc<Mutex<HashMap<i64, Registration>>>;

/// Alarms as tokio tasks that sleep until their instant and hand the payload
/// to the [`AlarmReceiver`].
pub struct TokioAlarmService {
    runtime: Handle,
    receiver: Arc<AlarmReceiver>,
    registry: Registry,
    generation: AtomicU64,
}

impl TokioAlarmService {
    pub fn new(runtime: Handle, receiver: Arc<AlarmReceiver>) -> Self {
        Self {
            runtime,
            receiver,
            registry: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Build on the runtime the caller is running in.
    pub fn current(receiver: Arc<AlarmReceiver>) -> Result<Self, AlarmError> {
        let runtime = Handle::try_current().map_err(|_| AlarmError::NoRuntime)?;
        Ok(Self::new(runtime, receiver))
    }

    fn register<F>(&self, id: i64, make_task: F)
    where
        F: FnOnce(u64, Registry) -> JoinHandle<()>,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        // Held across the spawn so a task that fires at once cannot try to
        // deregister before it is registered.
        let mut registry = lock(&self.registry);
        let task = make_task(generation, self.registry.clone());
        if let Some(old) = registry.insert(id, Registration { generation, task }) {
            debug!("Replacing alarm for reminder {}", id);
            old.task.abort();
        }
    }
}

impl AlarmService for TokioAlarmService {
    fn set_exact(&self, id: i64, trigger_at_ms: i64, payload: Vec<u8>) -> Result<(), AlarmError> {
        let delay = delay_until(trigger_at_ms, now_ms());
        debug!("Alarm {} set to fire once in {:?}", id, delay);

        let receiver = self.receiver.clone();
        self.register(id, |generation, registry| {
            self.runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                receiver.on_receive(&payload);

                let mut registry = lock(&registry);
                if registry.get(&id).map(|r| r.generation) == Some(generation) {
                    registry.remove(&id);
                }
            })
        });
        Ok(())
    }

    fn set_repeating(
        &self,
        id: i64,
        trigger_at_ms: i64,
        interval: Duration,
        payload: Vec<u8>,
    ) -> Result<(), AlarmError> {
        if interval.is_zero() {
            return Err(AlarmError::ZeroInterval(id));
        }

        let now = now_ms();
        let first = next_occurrence(trigger_at_ms, interval, now);
        let delay = delay_until(first, now);
        debug!(
            "Alarm {} set to repeat every {:?}, first in {:?}",
            id, interval, delay
        );

        let receiver = self.receiver.clone();
        self.register(id, |_, _| {
            self.runtime.spawn(async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + delay, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    receiver.on_receive(&payload);
                }
            })
        });
        Ok(())
    }

    fn cancel(&self, id: i64) -> bool {
        match lock(&self.registry).remove(&id) {
            Some(registration) => {
                registration.task.abort();
                true
            }
            None => false,
        }
    }

    fn is_scheduled(&self, id: i64) -> bool {
        lock(&self.registry).contains_key(&id)
    }
}

impl Drop for TokioAlarmService {
    fn drop(&mut self) {
        for (_, registration) in lock(&self.registry).drain() {
            registration.task.abort();
        }
    }
}

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<i64, Registration>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn delay_until(at_ms: i64, now_ms: i64) -> Duration {
    Duration::from_millis(at_ms.saturating_sub(now_ms).max(0) as u64)
}

/// First instant `start + k * interval` (k >= 0) that is not before `now`.
fn next_occurrence(start_ms: i64, interval: Duration, now_ms: i64) -> i64 {
    if start_ms >= now_ms {
        return start_ms;
    }
    let period = interval.as_millis() as i64;
    let elapsed = now_ms - start_ms;
    let periods = (elapsed + period - 1) / period;
    start_ms + periods * period
}
