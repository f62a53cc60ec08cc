use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use drive_core::{
    update, AppState, Msg, NotificationId, NotificationKind, Timestamp, UploadId, UploadStatus,
};
use drive_logging::drive_warn;

use super::effects::EffectRunner;
use super::persistence;

const TICK: Duration = Duration::from_millis(100);

/// Drives `update` from engine events and clock ticks, printing
/// notifications as they appear.
pub(crate) struct Session {
    state: AppState,
    runner: EffectRunner,
    shown: BTreeSet<NotificationId>,
    upload_marks: HashMap<UploadId, (UploadStatus, u8)>,
    report_uploads: bool,
}

impl Session {
    /// Restores persisted preferences and activity before anything else runs.
    pub(crate) fn start(runner: EffectRunner) -> Self {
        let (preferences, activity) = persistence::load_settings(runner.settings_dir());
        let mut session = Self {
            state: AppState::new(),
            runner,
            shown: BTreeSet::new(),
            upload_marks: HashMap::new(),
            report_uploads: false,
        };
        session.dispatch(Msg::RestorePersisted {
            preferences,
            activity,
        });
        session
    }

    pub(crate) fn report_uploads(&mut self, enabled: bool) {
        self.report_uploads = enabled;
    }

    pub(crate) fn state(&self) -> &AppState {
        &self.state
    }

    pub(crate) fn runner_mut(&mut self) -> &mut EffectRunner {
        &mut self.runner
    }

    pub(crate) fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.run(effects, &self.state);
        if self.state.consume_dirty() {
            self.render();
        }
    }

    /// Pumps events and ticks until `done` holds. Returns false on timeout.
    pub(crate) fn run_until(
        &mut self,
        timeout: Duration,
        mut done: impl FnMut(&AppState) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if done(&self.state) {
                return true;
            }
            if Instant::now() >= deadline {
                drive_warn!("Gave up waiting after {:?}", timeout);
                return false;
            }
            if let Some(msg) = self.runner.next_msg(TICK) {
                self.dispatch(msg);
            }
            self.dispatch(Msg::Tick(Timestamp::now()));
        }
    }

    fn render(&mut self) {
        for notification in self.state.notifications().active() {
            if self.shown.insert(notification.id) {
                let label = match notification.kind {
                    NotificationKind::Success => "ok",
                    NotificationKind::Error => "error",
                    NotificationKind::Warning => "warning",
                    NotificationKind::Info => "info",
                };
                eprintln!("[{label}] {}", notification.message);
            }
        }

        if !self.report_uploads {
            return;
        }
        for task in self.state.uploads().tasks() {
            let mark = (task.status, task.progress_percent);
            if self.upload_marks.insert(task.id, mark) != Some(mark) {
                eprintln!(
                    "  {:<40} {:>3}% {}",
                    task.display_name,
                    task.progress_percent,
                    task.status.as_str()
                );
            }
        }
    }
}
