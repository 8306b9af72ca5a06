//! Progress reporting for workflow execution

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;
use webpilot_application::AgentReporter;

/// Reports run progress with a spinner UI.
///
/// One spinner is live at a time: it shows the current step (or a
/// long-running engine phase such as planning) and its message is
/// updated as tasks start and retry. Lifecycle lines are printed
/// above it once the spinner is cleared.
pub struct ConsoleReporter {
    multi: MultiProgress,
    spinner: Mutex<Option<ProgressBar>>,
    verbose: bool,
}

impl ConsoleReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            spinner: Mutex::new(None),
            verbose: false,
        }
    }

    /// Create with verbose output (shows every task and engine detail)
    pub fn verbose() -> Self {
        Self {
            multi: MultiProgress::new(),
            spinner: Mutex::new(None),
            verbose: true,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("  {spinner:.green} {msg}")
            .unwrap()
    }

    fn start_spinner(&self, message: String) {
        self.finish_spinner();

        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(Self::spinner_style());
        pb.set_message(message);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        *self.spinner.lock().unwrap() = Some(pb);
    }

    fn finish_spinner(&self) {
        if let Some(pb) = self.spinner.lock().unwrap().take() {
            pb.finish_and_clear();
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentReporter for ConsoleReporter {
    fn info(&self, message: &str) {
        println!("{} {}", "→".cyan(), message);
    }

    fn success(&self, message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    fn failure(&self, message: &str) {
        self.finish_spinner();
        println!("{} {}", "✗".red(), message.red());
    }

    fn warning(&self, message: &str) {
        println!("{} {}", "ℹ".yellow(), message.yellow());
    }

    fn loading(&self, message: &str) {
        self.start_spinner(format!("{}...", message));
    }

    fn log(&self, message: &str) {
        if self.verbose {
            println!("    {}", message.dimmed());
        }
    }

    fn on_workflow_started(&self, goal: &str, url: &str) {
        println!();
        println!("🌐 {}", goal.bold());
        println!("   {}", url.dimmed());
        println!();
    }

    fn on_plan_created(&self, step_count: usize, revision: u32) {
        self.finish_spinner();
        if revision <= 1 {
            println!("📝 plan ready: {} steps", step_count);
        } else {
            println!("📝 plan revised: {} steps (revision {})", step_count, revision);
        }
    }

    fn on_step_started(&self, order: u32, total: usize, description: &str) {
        self.finish_spinner();
        println!(
            "{} {}",
            format!("[{}/{}]", order, total).cyan().bold(),
            description
        );
        self.start_spinner("...".to_string());
    }

    fn on_step_finished(&self, _order: u32, success: bool) {
        self.finish_spinner();
        if success {
            println!("  {} {}", "✓".green(), "done".green());
        } else {
            println!("  {} {}", "✗".red(), "failed".red());
        }
    }

    fn on_task_started(&self, description: &str) {
        if let Some(pb) = self.spinner.lock().unwrap().as_ref() {
            pb.set_message(truncate(description, 60));
        }
        if self.verbose {
            println!("    {} {}", "→".blue(), description);
        }
    }

    fn on_task_retry(&self, description: &str, attempt: u32, max_retries: u32) {
        if let Some(pb) = self.spinner.lock().unwrap().as_ref() {
            pb.set_message(format!(
                "retry {}/{}: {}",
                attempt,
                max_retries,
                truncate(description, 50)
            ));
        }
        if self.verbose {
            println!(
                "    {} retry {}/{}: {}",
                "↻".yellow(),
                attempt,
                max_retries,
                description
            );
        }
    }

    fn on_replan(&self, reason: &str, total_replans: u32) {
        self.finish_spinner();
        println!(
            "{} replanning ({}): {}",
            "↻".yellow(),
            total_replans,
            reason.yellow()
        );
    }

    fn on_workflow_finished(&self, status: &str, completion_percentage: u8) {
        self.finish_spinner();
        println!();
        let line = format!("{} ({}% complete)", status, completion_percentage);
        match status {
            "success" => println!("🏁 {}", line.green().bold()),
            "partial" => println!("🏁 {}", line.yellow().bold()),
            "degraded" => println!("🏁 {}", line.yellow()),
            _ => println!("🏁 {}", line.red().bold()),
        }
    }
}

/// Simple text-based progress (no spinners)
pub struct PlainReporter {
    verbose: bool,
}

impl PlainReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl AgentReporter for PlainReporter {
    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    fn failure(&self, message: &str) {
        println!("{} {}", "✗".red(), message);
    }

    fn warning(&self, message: &str) {
        println!("! {}", message);
    }

    fn loading(&self, message: &str) {
        println!("{}...", message);
    }

    fn log(&self, message: &str) {
        if self.verbose {
            println!("    {}", message);
        }
    }

    fn on_workflow_started(&self, goal: &str, url: &str) {
        println!("Goal: {}", goal);
        println!("Start: {}", url);
    }

    fn on_plan_created(&self, step_count: usize, revision: u32) {
        if revision <= 1 {
            println!("Plan: {} steps", step_count);
        } else {
            println!("Plan revised: {} steps (revision {})", step_count, revision);
        }
    }

    fn on_step_started(&self, order: u32, total: usize, description: &str) {
        println!("[{}/{}] {}", order, total, description);
    }

    fn on_step_finished(&self, _order: u32, success: bool) {
        if success {
            println!("  {} done", "✓".green());
        } else {
            println!("  {} failed", "✗".red());
        }
    }

    fn on_task_started(&self, description: &str) {
        println!("  → {}", description);
    }

    fn on_task_retry(&self, description: &str, attempt: u32, max_retries: u32) {
        println!("  retry {}/{}: {}", attempt, max_retries, description);
    }

    fn on_replan(&self, reason: &str, total_replans: u32) {
        println!("Replanning ({}): {}", total_replans, reason);
    }

    fn on_workflow_finished(&self, status: &str, completion_percentage: u8) {
        println!("Finished: {} ({}% complete)", status, completion_percentage);
    }
}

/// Truncate a string to a maximum length
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
