//! Assertion collector.
//!
//! A [`Grader`] records pass/fail outcomes for one run instead of aborting
//! on the first failure. [`Grader::done`] closes the run and hands back a
//! [`Report`].

use memfs_kernel::Syscalls;
use serde::Serialize;

/// Outcome of one graded run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub name: String,
    pub passed: usize,
    pub failed: usize,
    /// Messages of failed assertions, in order.
    pub messages: Vec<String>,
    /// Every cwd printed during the run.
    pub cwd_trace: Vec<String>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    /// Fold several reports into one, e.g. the sessions of a parallel run.
    pub fn merge(name: impl Into<String>, reports: impl IntoIterator<Item = Report>) -> Self {
        let mut merged = Report {
            name: name.into(),
            ..Default::default()
        };
        for report in reports {
            merged.passed += report.passed;
            merged.failed += report.failed;
            merged
                .messages
                .extend(report.messages.into_iter().map(|m| format!("{}: {m}", report.name)));
            merged.cwd_trace.extend(report.cwd_trace);
        }
        merged
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.is_success() { "PASS" } else { "FAIL" };
        write!(
            f,
            "{status} {}: {}/{} assertions passed",
            self.name,
            self.passed,
            self.total()
        )?;
        for message in &self.messages {
            write!(f, "\n  - {message}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Grader {
    report: Report,
}

impl Grader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            report: Report {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    /// Record `condition`. Failures are logged without a message.
    pub fn assert_true(&mut self, condition: bool) -> bool {
        let index = self.report.total() + 1;
        self.assert_true_msg(condition, format!("assertion #{index} failed"))
    }

    /// Record `condition`, keeping `message` if it is false.
    pub fn assert_true_msg(&mut self, condition: bool, message: impl Into<String>) -> bool {
        if condition {
            self.report.passed += 1;
        } else {
            let message = message.into();
            tracing::warn!(run = %self.report.name, message = %message.trim_end(), "assertion failed");
            self.report.failed += 1;
            self.report.messages.push(message.trim_end().to_string());
        }
        condition
    }

    /// Record and log the caller's cwd.
    pub fn print_cwd(&mut self, sys: &impl Syscalls) -> String {
        let cwd = sys.cwd().unwrap_or_else(|| "<removed>".to_string());
        tracing::info!(run = %self.report.name, cwd = %cwd, "cwd");
        self.report.cwd_trace.push(cwd.clone());
        cwd
    }

    pub fn done(self) -> Report {
        tracing::info!(
            run = %self.report.name,
            passed = self.report.passed,
            failed = self.report.failed,
            "done"
        );
        self.report
    }
}
