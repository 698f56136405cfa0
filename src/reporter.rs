use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// User facing progress and log output
pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    fn start_spinner(&self, message: &str);
    fn success_spinner(&self, message: &str);
    fn stop_spinner(&self);
}

/// Terminal reporter: colored lines plus a single `indicatif` spinner.
///
/// Every line is mirrored to `tracing` so `--verbose` runs keep a complete log.
#[derive(Default)]
pub struct ConsoleReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn print(&self, line: String, to_stderr: bool) {
        let spinner = self.spinner.lock().unwrap_or_else(PoisonError::into_inner);
        let emit = || {
            if to_stderr {
                eprintln!("{line}");
            } else {
                println!("{line}");
            }
        };

        match spinner.as_ref() {
            Some(pb) => pb.suspend(emit),
            None => emit(),
        }
    }

    fn take_spinner(&self) -> Option<ProgressBar> {
        self.spinner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Reporter for ConsoleReporter {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
        self.print(message.to_string(), false);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
        self.print(format!("{} {}", "⚠".yellow(), message.yellow()), true);
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
        self.print(format!("{} {}", "✗".red(), message.red()), true);
    }

    fn start_spinner(&self, message: &str) {
        tracing::info!("{message}");
        if let Some(previous) = self.take_spinner() {
            previous.finish_and_clear();
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        *self.spinner.lock().unwrap_or_else(PoisonError::into_inner) = Some(pb);
    }

    fn success_spinner(&self, message: &str) {
        tracing::info!("{message}");
        if let Some(pb) = self.take_spinner() {
            pb.finish_and_clear();
        }
        eprintln!("{} {}", "✓".green(), message.green());
    }

    fn stop_spinner(&self) {
        if let Some(pb) = self.take_spinner() {
            pb.finish_and_clear();
        }
    }
}
