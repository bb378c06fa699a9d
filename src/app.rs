use std::sync::Arc;

use chrono::Local;
use color_eyre::Result;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::alarm::{
    AlarmReceiver, AlwaysGranted, DesktopNotifier, ExactAlarmAccess, PermissionFile,
    ReminderScheduler, TokioAlarmService,
};
use crate::components::{CategoryFilter, ReminderFormState};
use crate::config::Config;
use crate::reminder::{Reminder, Store};
use crate::view_model::{
    Action, Observers, PermissionOutcome, PermissionState, PromptState, ReminderViewModel,
    ViewModelHandle,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Form,
    /// The precise-timing permission popup is open.
    Prompt,
}

pub struct App {
    pub running: bool,
    pub input_mode: InputMode,
    pub filter: CategoryFilter,
    pub selected: usize,
    pub form_state: Option<ReminderFormState>,
    pub show_help: bool,
    pub status_message: Option<String>,
    reminders: watch::Receiver<Vec<Reminder>>,
    permission: watch::Receiver<PermissionState>,
    messages: mpsc::UnboundedReceiver<String>,
    view_model: ViewModelHandle,
    access: Arc<dyn ExactAlarmAccess>,
    /// Where a grant is written. `None` when the permission is not required.
    grants: Option<PermissionFile>,
}

impl App {
    /// Wire up the store, alarms and view-model. Must run inside a tokio runtime.
    pub fn new(config: &Config) -> Result<Self> {
        let store = Store::open(config.database_path())?;

        let notifier = DesktopNotifier::new(
            config.notifications.app_name.clone(),
            config.notifications.open_command.clone(),
        );
        let receiver = Arc::new(AlarmReceiver::new(Arc::new(notifier)));
        let alarms = Arc::new(TokioAlarmService::current(receiver)?);

        let grants = if config.require_exact_alarm_permission {
            PermissionFile::default_path().map(PermissionFile::new)
        } else {
            None
        };
        let access: Arc<dyn ExactAlarmAccess> = match grants.clone() {
            Some(file) => Arc::new(file),
            None => Arc::new(AlwaysGranted),
        };

        let scheduler = ReminderScheduler::new(alarms, access.clone());
        let (vm, observers) = ReminderViewModel::new(store, scheduler);
        let (view_model, _task) = vm.spawn();
        view_model.dispatch(Action::RearmAll);

        Ok(Self::with_parts(view_model, observers, access, grants))
    }

    pub fn with_parts(
        view_model: ViewModelHandle,
        observers: Observers,
        access: Arc<dyn ExactAlarmAccess>,
        grants: Option<PermissionFile>,
    ) -> Self {
        Self {
            running: true,
            input_mode: InputMode::Normal,
            filter: CategoryFilter::default(),
            selected: 0,
            form_state: None,
            show_help: false,
            status_message: None,
            reminders: observers.reminders,
            permission: observers.permission,
            messages: observers.messages,
            view_model,
            access,
            grants,
        }
    }

    /// Reminders that pass the category filter, in id order.
    pub fn visible(&self) -> Vec<Reminder> {
        let all = self.reminders.borrow();
        self.filter.apply(&all).into_iter().cloned().collect()
    }

    pub fn selected_reminder(&self) -> Option<Reminder> {
        self.visible().into_iter().nth(self.selected)
    }

    pub fn settings_path(&self) -> Option<String> {
        self.grants
            .as_ref()
            .map(|g| g.path().display().to_string())
    }

    /// Pull in whatever the view-model published since the last frame.
    pub fn tick(&mut self) {
        while let Ok(message) = self.messages.try_recv() {
            self.status_message = Some(message);
        }

        if self.permission.has_changed().unwrap_or(false) {
            let state = *self.permission.borrow_and_update();
            self.on_permission_state(state);
        }

        self.clamp_selection();
    }

    fn on_permission_state(&mut self, state: PermissionState) {
        if state.prompt == PromptState::Needed && self.input_mode != InputMode::Prompt {
            debug!("Showing exact alarm permission prompt");
            self.form_state = None;
            self.input_mode = InputMode::Prompt;
            // Only marks the prompt as shown; the answer arrives later.
            self.view_model.dispatch(Action::PromptHandled);
        }

        match state.outcome {
            PermissionOutcome::Granted => {
                self.status_message = Some("Exact alarm permission granted!".to_string());
                self.view_model.dispatch(Action::ClearOutcome);
            }
            PermissionOutcome::Denied => {
                self.status_message = Some(
                    "Exact alarm permission denied. Reminders may not be precise.".to_string(),
                );
                self.view_model.dispatch(Action::ClearOutcome);
            }
            PermissionOutcome::Unset => {}
        }
    }

    /// "Grant in settings": record the grant, then check it like a return
    /// from the settings screen would.
    pub fn grant_permission(&mut self) {
        if let Some(ref grants) = self.grants {
            if let Err(e) = grants.set_exact_alarms(true) {
                warn!("{}", e);
                self.status_message = Some("Could not open permission settings.".to_string());
            }
        }
        self.input_mode = InputMode::Normal;
        self.recheck_permission();
    }

    pub fn defer_permission(&mut self) {
        self.input_mode = InputMode::Normal;
        self.view_model.dispatch(Action::PermissionDenied);
    }

    pub fn recheck_permission(&mut self) {
        if self.access.can_schedule_exact() {
            self.view_model.dispatch(Action::PermissionGranted);
        } else {
            self.view_model.dispatch(Action::PermissionDenied);
        }
    }

    // ── List ──

    pub fn select_next(&mut self) {
        let len = self.visible().len();
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn next_filter(&mut self) {
        self.filter.next();
        self.selected = 0;
    }

    pub fn prev_filter(&mut self) {
        self.filter.prev();
        self.selected = 0;
    }

    pub fn delete_selected(&mut self) {
        if let Some(reminder) = self.selected_reminder() {
            self.status_message = Some(format!("Deleted \"{}\"", reminder.title));
            self.view_model.dispatch(Action::Delete(reminder));
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    // ── Form ──

    pub fn open_new_form(&mut self) {
        self.form_state = Some(ReminderFormState::new(Local::now()));
        self.input_mode = InputMode::Form;
    }

    pub fn open_edit_form(&mut self) {
        if let Some(reminder) = self.selected_reminder() {
            self.form_state = Some(ReminderFormState::edit(&reminder, Local::now()));
            self.input_mode = InputMode::Form;
        }
    }

    pub fn close_form(&mut self) {
        self.form_state = None;
        self.input_mode = InputMode::Normal;
    }

    pub fn submit_form(&mut self) {
        let Some(ref mut form) = self.form_state else {
            return;
        };

        match form.validate() {
            Ok(new) => {
                let action = match form.editing {
                    Some(ref original) => Action::Update(Reminder::from_new(original.id, new)),
                    None => Action::Insert(new),
                };
                self.view_model.dispatch(action);
                self.close_form();
            }
            Err(e) => {
                form.error = Some(e.to_string());
            }
        }
    }

    pub fn form_input_char(&mut self, c: char) {
        if let Some(ref mut form) = self.form_state {
            if c == ' ' && form.active_field.is_toggle() {
                form.toggle();
            } else {
                form.input_char(c);
            }
        }
    }

    pub fn form_backspace(&mut self) {
        if let Some(ref mut form) = self.form_state {
            form.backspace();
        }
    }

    pub fn form_tab(&mut self) {
        if let Some(ref mut form) = self.form_state {
            form.active_field = form.active_field.next();
        }
    }

    pub fn form_backtab(&mut self) {
        if let Some(ref mut form) = self.form_state {
            form.active_field = form.active_field.prev();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::testing::SwitchAccess;
    use crate::reminder::NewReminder;

    struct Harness {
        app: App,
        actions: mpsc::UnboundedReceiver<Action>,
        reminders: watch::Sender<Vec<Reminder>>,
        permission: watch::Sender<PermissionState>,
        messages: mpsc::UnboundedSender<String>,
        access: Arc<SwitchAccess>,
    }

    fn harness() -> Harness {
        let (view_model, actions) = ViewModelHandle::detached();
        let (reminders, reminders_rx) = watch::channel(Vec::new());
        let (permission, permission_rx) = watch::channel(PermissionState::default());
        let (messages, messages_rx) = mpsc::unbounded_channel();
        let access = Arc::new(SwitchAccess::new(false));
        let observers = Observers {
            reminders: reminders_rx,
            permission: permission_rx,
            messages: messages_rx,
        };
        Harness {
            app: App::with_parts(view_model, observers, access.clone(), None),
            actions,
            reminders,
            permission,
            messages,
            access,
        }
    }

    fn drain(actions: &mut mpsc::UnboundedReceiver<Action>) -> Vec<Action> {
        let mut out = Vec::new();
        while let Ok(a) = actions.try_recv() {
            out.push(a);
        }
        out
    }

    fn stored(id: i64, title: &str, category: &str) -> Reminder {
        Reminder::from_new(id, NewReminder::new(title, 0).category(category))
    }

    #[test]
    fn test_blank_title_never_dispatches() {
        let mut h = harness();
        h.app.open_new_form();
        h.app.submit_form();

        assert_eq!(h.app.input_mode, InputMode::Form);
        assert_eq!(
            h.app.form_state.as_ref().unwrap().error.as_deref(),
            Some("Title cannot be empty")
        );
        assert!(drain(&mut h.actions).is_empty());
    }

    #[test]
    fn test_valid_form_dispatches_insert() {
        let mut h = harness();
        h.app.open_new_form();
        for c in "Buy milk".chars() {
            h.app.form_input_char(c);
        }
        h.app.submit_form();

        assert_eq!(h.app.input_mode, InputMode::Normal);
        match drain(&mut h.actions).as_slice() {
            [Action::Insert(new)] => assert_eq!(new.title, "Buy milk"),
            other => panic!("unexpected actions: {:?}", other),
        }
    }

    #[test]
    fn test_edit_dispatches_update_with_same_id() {
        let mut h = harness();
        h.reminders.send_replace(vec![stored(4, "Old", "Work")]);
        h.app.tick();

        h.app.open_edit_form();
        h.app.form_input_char('!');
        h.app.submit_form();

        match drain(&mut h.actions).as_slice() {
            [Action::Update(r)] => {
                assert_eq!(r.id, 4);
                assert_eq!(r.title, "Old!");
                assert_eq!(r.category, "Work");
            }
            other => panic!("unexpected actions: {:?}", other),
        }
    }

    #[test]
    fn test_filter_narrows_selection() {
        let mut h = harness();
        h.reminders.send_replace(vec![
            stored(1, "a", "Personal"),
            stored(2, "b", "Work"),
            stored(3, "c", "Work"),
        ]);
        h.app.tick();
        assert_eq!(h.app.visible().len(), 3);

        h.app.next_filter();
        h.app.next_filter();
        assert_eq!(h.app.filter.label(), "Work");
        h.app.select_next();
        h.app.select_next();
        assert_eq!(h.app.selected_reminder().unwrap().id, 3);

        h.app.delete_selected();
        match drain(&mut h.actions).as_slice() {
            [Action::Delete(r)] => assert_eq!(r.id, 3),
            other => panic!("unexpected actions: {:?}", other),
        }

        h.reminders
            .send_replace(vec![stored(1, "a", "Personal"), stored(2, "b", "Work")]);
        h.app.tick();
        assert_eq!(h.app.selected, 0);
    }

    #[test]
    fn test_prompt_is_acknowledged_immediately() {
        let mut h = harness();
        h.permission.send_replace(PermissionState {
            prompt: PromptState::Needed,
            outcome: PermissionOutcome::Unset,
        });
        h.app.tick();

        assert_eq!(h.app.input_mode, InputMode::Prompt);
        assert!(matches!(
            drain(&mut h.actions).as_slice(),
            [Action::PromptHandled]
        ));

        // no change, no second acknowledgement
        h.app.tick();
        assert!(drain(&mut h.actions).is_empty());
    }

    #[test]
    fn test_grant_rechecks_capability() {
        let mut h = harness();
        h.app.input_mode = InputMode::Prompt;
        h.access.set(true);
        h.app.grant_permission();
        assert_eq!(h.app.input_mode, InputMode::Normal);
        assert!(matches!(
            drain(&mut h.actions).as_slice(),
            [Action::PermissionGranted]
        ));

        h.access.set(false);
        h.app.grant_permission();
        assert!(matches!(
            drain(&mut h.actions).as_slice(),
            [Action::PermissionDenied]
        ));
    }

    #[test]
    fn test_outcome_shown_once_then_cleared() {
        let mut h = harness();
        h.permission.send_replace(PermissionState {
            prompt: PromptState::NotNeeded,
            outcome: PermissionOutcome::Denied,
        });
        h.app.tick();

        assert_eq!(
            h.app.status_message.as_deref(),
            Some("Exact alarm permission denied. Reminders may not be precise.")
        );
        assert!(matches!(
            drain(&mut h.actions).as_slice(),
            [Action::ClearOutcome]
        ));
    }

    #[test]
    fn test_messages_reach_status_bar() {
        let mut h = harness();
        h.messages.send("Error setting alarm.".to_string()).unwrap();
        h.app.tick();
        assert_eq!(h.app.status_message.as_deref(), Some("Error setting alarm."));
    }
}
