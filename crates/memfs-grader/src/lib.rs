//! # memfs-grader
//!
//! Acceptance harness for memfs: an assertion collector, the built-in
//! scenarios, a small syscall script language and a parallel runner.

pub mod grader;
pub mod runner;
pub mod scenarios;
pub mod script;

pub use grader::{Grader, Report};
pub use runner::{RunError, run_in_session, run_parallel};
pub use scenarios::Scenario;
pub use script::{Call, Expect, Outcome, Script, ScriptError, Step};
