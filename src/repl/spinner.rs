//! Single-line "Thinking..." animation on stderr.

use colored::Colorize;
use std::io::{IsTerminal, Write};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

static FRAMES: [&str; 4] = ["◐", "◓", "◑", "◒"];
const TICK: Duration = Duration::from_millis(150);

/// Running animation. Dropping or stopping it clears the line.
pub struct Spinner {
    task: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Start animating `label`. Does nothing when stderr is not a terminal
    /// or when `enabled` is false.
    pub fn start(label: &str, enabled: bool) -> Self {
        if !enabled || !std::io::stderr().is_terminal() {
            return Self { task: None };
        }

        let label = label.to_string();
        let task = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(TICK);
            for frame in FRAMES.iter().cycle() {
                ticker.tick().await;
                let line = format!(
                    "\r  {} {}",
                    format!("{frame} {label}").cyan().italic(),
                    format!("({:.1}s)", started.elapsed().as_secs_f32()).dimmed()
                );
                let mut err = std::io::stderr();
                let _ = write!(err, "{line}");
                let _ = err.flush();
            }
        });
        Self { task: Some(task) }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let mut err = std::io::stderr();
            let _ = write!(err, "\r\x1b[K");
            let _ = err.flush();
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop();
    }
}
