//! Running scenarios in one or more sessions.

use memfs_kernel::{FileSystem, FsError};
use thiserror::Error;

use crate::grader::Report;
use crate::scenarios::Scenario;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("session setup failed: {0}")]
    Setup(#[from] FsError),

    #[error("session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Run `scenario` in a fresh session based at `base`, creating it if needed.
pub fn run_in_session(fs: &FileSystem, scenario: Scenario, base: &str) -> Result<Report, FsError> {
    let mut session = fs.session();
    if base != "/" {
        session.mkdir(base)?;
        session.chdir(base)?;
    }
    Ok(scenario.run(&mut session, base))
}

/// Run `sessions` copies of `scenario` at once on blocking tasks.
///
/// A single session runs at `/`; otherwise each copy gets its own top-level
/// directory so their absolute paths do not collide.
pub async fn run_parallel(
    fs: &FileSystem,
    scenario: Scenario,
    sessions: usize,
) -> Result<Report, RunError> {
    if sessions <= 1 {
        return Ok(run_in_session(fs, scenario, "/")?);
    }

    tracing::info!(scenario = %scenario, sessions, "starting parallel run");
    let handles: Vec<_> = (0..sessions)
        .map(|i| {
            let fs = fs.clone();
            let base = format!("/{scenario}-{i}");
            tokio::task::spawn_blocking(move || run_in_session(&fs, scenario, &base))
        })
        .collect();

    let mut reports = Vec::with_capacity(sessions);
    for handle in handles {
        reports.push(handle.await??);
    }
    Ok(Report::merge(scenario.to_string(), reports))
}
