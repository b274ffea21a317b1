//! Spinner for stages that produce no output of their own

use super::context::UiContext;
use console::style;
use std::time::Instant;

/// Spinner that degrades to one plain line per transition in CI
pub struct TaskSpinner {
    bar: Option<cliclack::ProgressBar>,
    fancy: bool,
    started: Option<Instant>,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            bar: None,
            fancy: ctx.use_fancy_output(),
            started: None,
        }
    }

    /// Begin a task
    pub fn start(&mut self, message: &str) {
        self.started = Some(Instant::now());
        if !self.fancy {
            println!("{} {}", style("...").dim(), message);
            return;
        }
        let bar = cliclack::spinner();
        bar.start(message);
        self.bar = Some(bar);
    }

    /// Finish the task successfully, appending the elapsed time
    pub fn stop(&mut self, message: &str) {
        let message = self.with_elapsed(message);
        match self.bar.take() {
            Some(bar) => bar.stop(message),
            None => println!("{} {}", style("[OK]").green(), message),
        }
    }

    /// Finish the task as failed
    pub fn stop_error(&mut self, message: &str) {
        let message = self.with_elapsed(message);
        match self.bar.take() {
            Some(bar) => bar.error(message),
            None => println!("{} {}", style("[FAIL]").red(), message),
        }
    }

    fn with_elapsed(&mut self, message: &str) -> String {
        match self.started.take() {
            Some(at) => format!("{} ({:.1}s)", message, at.elapsed().as_secs_f32()),
            None => message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_spinner_transitions() {
        let mut spinner = TaskSpinner::new(&UiContext::non_interactive());
        spinner.start("Checking Podman...");
        spinner.stop("Podman ready");
        spinner.start("Checking Docker...");
        spinner.stop_error("Docker is not available");
    }

    #[test]
    fn elapsed_only_after_start() {
        let mut spinner = TaskSpinner::new(&UiContext::non_interactive());
        assert_eq!(spinner.with_elapsed("done"), "done");
        spinner.start("working");
        assert!(spinner.with_elapsed("done").starts_with("done ("));
    }
}
