use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Frames followed by the (empty) finished state.
const TICK_STRINGS: &[&str] = &["-", "/", "|", "\\", ""];
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Progress indicator drawn on stderr while a completion call is in flight.
/// Clears itself when stopped or dropped.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    /// Draws to stderr; indicatif hides the bar when stderr is not a terminal.
    pub fn start() -> Self {
        Self::start_with(ProgressDrawTarget::stderr())
    }

    pub fn start_with(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_draw_target(target);
        bar.set_style(ProgressStyle::default_spinner().tick_strings(TICK_STRINGS));
        bar.enable_steady_tick(FRAME_INTERVAL);
        Self { bar }
    }

    pub fn is_running(&self) -> bool {
        !self.bar.is_finished()
    }

    pub fn stop(self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
