//! Line-oriented console output.

use std::io::{self, BufRead, Write};

use crossterm::style::Stylize;
use luk3_core::plan::PlanReason;
use luk3_core::{InstallTask, Reporter};
use luk3_schema::{BundleName, Version};

use super::theme::{Theme, plural};

/// Prints progress events as styled lines.
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter {
    theme: Theme,
}

impl ConsoleReporter {
    /// Create a reporter with the default theme.
    pub fn new() -> Self {
        Self::default()
    }
}

fn reason_label(reason: PlanReason) -> &'static str {
    match reason {
        PlanReason::Missing => "missing",
        PlanReason::Outdated => "outdated",
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        println!();
        println!("{}", title.with(self.theme.colors.heading).bold());
    }

    fn bundle_started(&self, bundle: &BundleName) {
        println!(
            "{} {}",
            self.theme.glyphs.busy.with(self.theme.colors.busy),
            bundle.as_str().with(self.theme.colors.bundle)
        );
    }

    fn bundle_up_to_date(&self, _bundle: &BundleName) {
        println!(
            "  {} {}",
            self.theme.glyphs.done.with(self.theme.colors.up_to_date),
            "up to date".with(self.theme.colors.detail)
        );
    }

    fn bundle_planned(&self, _bundle: &BundleName, tasks: &[InstallTask]) {
        println!(
            "  {} {} to update",
            self.theme.glyphs.planned.with(self.theme.colors.planned),
            plural(tasks.len(), "file")
        );
        for task in tasks {
            println!(
                "      {} {}",
                task.display_path().with(self.theme.colors.detail),
                format!("({})", reason_label(task.reason)).with(self.theme.colors.detail)
            );
        }
    }

    fn fetching(&self, _bundle: &BundleName) {
        println!(
            "  {} {}",
            self.theme.glyphs.busy.with(self.theme.colors.busy),
            "fetching".with(self.theme.colors.detail)
        );
    }

    fn fetched(&self, _bundle: &BundleName, version: &Version) {
        println!(
            "  {} fetched {}",
            self.theme.glyphs.done.with(self.theme.colors.up_to_date),
            version.as_str().with(self.theme.colors.version)
        );
    }

    fn task_done(&self, task: &InstallTask) {
        println!(
            "    {} {}",
            self.theme.glyphs.done.with(self.theme.colors.up_to_date),
            task.display_path()
        );
    }

    fn task_failed(&self, task: &InstallTask, reason: &str) {
        println!(
            "    {} {}: {}",
            self.theme.glyphs.failed.with(self.theme.colors.failed),
            task.display_path(),
            reason.with(self.theme.colors.failed)
        );
    }

    fn bundle_failed(&self, _bundle: &BundleName, reason: &str) {
        println!(
            "  {} {}",
            self.theme.glyphs.failed.with(self.theme.colors.failed),
            reason.with(self.theme.colors.failed)
        );
    }

    fn info(&self, msg: &str) {
        println!("{} {msg}", self.theme.glyphs.note.with(self.theme.colors.detail));
    }

    fn success(&self, msg: &str) {
        println!(
            "{} {}",
            self.theme.glyphs.done.with(self.theme.colors.up_to_date),
            msg.with(self.theme.colors.up_to_date)
        );
    }

    fn warning(&self, msg: &str) {
        println!(
            "{} {}",
            self.theme.glyphs.warning.with(self.theme.colors.warning),
            msg.with(self.theme.colors.warning)
        );
    }

    fn error(&self, msg: &str) {
        eprintln!(
            "{} {}",
            self.theme.glyphs.failed.with(self.theme.colors.failed),
            msg.with(self.theme.colors.failed)
        );
    }
}

/// Block until the user presses Enter. Input errors are ignored.
pub fn wait_for_enter() {
    print!("Press Enter to exit...");
    io::stdout().flush().ok();
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok();
}
