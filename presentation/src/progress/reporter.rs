//! Progress reporting while a case is assessed and synthesized

use ckm_application::{BoardPhase, ProgressNotifier};
use ckm_domain::{AssessmentStatus, Role};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with an indicatif bar per phase
pub struct ProgressReporter {
    phase_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            phase_bar: Mutex::new(None),
        }
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn role_mark(role: &Role, status: AssessmentStatus) -> String {
        match status {
            AssessmentStatus::Ok => format!("{} {}", "v".green(), role.display_name()),
            AssessmentStatus::TimedOut => {
                format!("{} {} (timed out)", "x".red(), role.display_name())
            }
            AssessmentStatus::Failed => format!("{} {} (failed)", "x".red(), role.display_name()),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_phase_start(&self, phase: &BoardPhase, total_tasks: usize) {
        let pb = match phase {
            BoardPhase::Assessment => {
                let pb = ProgressBar::new(total_tasks as u64);
                pb.set_style(Self::phase_style());
                pb
            }
            BoardPhase::Synthesis => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(Self::spinner_style());
                pb
            }
        };
        pb.set_prefix(format!("{}...", phase.display_name()));
        pb.enable_steady_tick(Duration::from_millis(120));

        if let Ok(mut slot) = self.phase_bar.lock() {
            *slot = Some(pb);
        }
    }

    fn on_role_complete(&self, role: &Role, status: AssessmentStatus) {
        if let Ok(slot) = self.phase_bar.lock()
            && let Some(pb) = slot.as_ref()
        {
            pb.set_message(Self::role_mark(role, status));
            pb.inc(1);
        }
    }

    fn on_synthesis_attempt(&self, attempt: u32) {
        if attempt > 1
            && let Ok(slot) = self.phase_bar.lock()
            && let Some(pb) = slot.as_ref()
        {
            pb.set_message(format!("retry {}", attempt - 1));
        }
    }

    fn on_phase_complete(&self, phase: &BoardPhase) {
        if let Ok(mut slot) = self.phase_bar.lock()
            && let Some(pb) = slot.take()
        {
            pb.finish_and_clear();
            eprintln!("{} {}", "v".green(), phase.display_name());
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_phase_start(&self, phase: &BoardPhase, total_tasks: usize) {
        match phase {
            BoardPhase::Assessment => eprintln!(
                "{} {} ({} roles)",
                "->".cyan(),
                phase.display_name().bold(),
                total_tasks
            ),
            BoardPhase::Synthesis => eprintln!("{} {}", "->".cyan(), phase.display_name().bold()),
        }
    }

    fn on_role_complete(&self, role: &Role, status: AssessmentStatus) {
        eprintln!("  {}", ProgressReporter::role_mark(role, status));
    }

    fn on_synthesis_attempt(&self, attempt: u32) {
        if attempt > 1 {
            eprintln!("  {} regenerating (attempt {})", "~".yellow(), attempt);
        }
    }

    fn on_phase_complete(&self, _phase: &BoardPhase) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_marks() {
        colored::control::set_override(false);
        assert_eq!(
            ProgressReporter::role_mark(&Role::Nephrology, AssessmentStatus::TimedOut),
            "x Nephrology (timed out)"
        );
        assert_eq!(
            ProgressReporter::role_mark(&Role::Cardiology, AssessmentStatus::Ok),
            "v Cardiology"
        );
    }

    #[test]
    fn test_reporter_lifecycle_without_terminal() {
        let reporter = ProgressReporter::new();
        reporter.on_phase_start(&BoardPhase::Assessment, 3);
        reporter.on_role_complete(&Role::Cardiology, AssessmentStatus::Ok);
        reporter.on_phase_complete(&BoardPhase::Assessment);
        assert!(reporter.phase_bar.lock().unwrap().is_none());
    }
}
