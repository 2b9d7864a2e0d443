//! Worklist reading and the sequential row-driven batch processor.
//!
//! Every batch mutation in the CLI is the same loop: read a delimited row,
//! issue one remote call, classify the response, print the echoed fields with
//! an outcome tag, advance. The loop lives here once, parameterized by the
//! per-row operation; command handlers only supply the remote call.

use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::anyhow;
use tokio::time::sleep;

use crate::client::{CliError, CliResult};

/// Classified result of one batch row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Updated,
    Changed,
    Removed,
    NoChange,
    Error(String),
}

impl Outcome {
    /// Stable textual tag appended to the echoed row fields.
    pub(crate) const fn tag(&self) -> &'static str {
        match self {
            Self::Updated => "UPDATED",
            Self::Changed => "CHANGED",
            Self::Removed => "REMOVED",
            Self::NoChange => "NO CHANGE",
            Self::Error(_) => "ERROR",
        }
    }

    /// Classify a response status: success keeps the given outcome, anything
    /// else degrades to [`Outcome::Error`] carrying the status.
    pub(crate) fn from_status(status: reqwest::StatusCode, success: Self) -> Self {
        if status.is_success() {
            success
        } else {
            Self::Error(format!("status {status}"))
        }
    }

    /// Wrap a transport-level failure.
    pub(crate) fn transport_error(err: &reqwest::Error) -> Self {
        Self::Error(err.to_string())
    }
}

/// One record of a worklist file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WorklistRow {
    pub(crate) line_number: usize,
    pub(crate) fields: Vec<String>,
}

impl WorklistRow {
    pub(crate) fn field(&self, index: usize) -> &str {
        self.fields.get(index).map_or("", String::as_str)
    }
}

/// Knobs shared by every batch operation in one invocation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BatchOptions {
    pub(crate) delimiter: char,
    pub(crate) pacing: Duration,
}

impl BatchOptions {
    pub(crate) fn join(&self, fields: &[String]) -> String {
        fields.join(&self.delimiter.to_string())
    }

    /// Pause between remote calls when pacing is configured.
    pub(crate) async fn pace(&self) {
        if !self.pacing.is_zero() {
            sleep(self.pacing).await;
        }
    }
}

/// Read a worklist file into rows, splitting each line on the delimiter.
/// Blank lines are skipped; field validation is left to the processor.
pub(crate) fn read_worklist(path: &Path, delimiter: char) -> CliResult<Vec<WorklistRow>> {
    let contents = std::fs::read_to_string(path).map_err(|err| {
        CliError::validation(format!(
            "failed to read worklist '{}': {err}",
            path.display()
        ))
    })?;

    Ok(contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| WorklistRow {
            line_number: index + 1,
            fields: line
                .trim_end_matches('\r')
                .split(delimiter)
                .map(str::to_string)
                .collect(),
        })
        .collect())
}

/// Process worklist rows strictly in order: one remote call per row, one
/// output line per well-formed row.
///
/// Rows with fewer than `min_columns` fields are reported and skipped
/// without consuming a remote call. A row that classifies as
/// [`Outcome::Error`] never aborts the batch.
pub(crate) async fn process_worklist<W, F, Fut>(
    rows: Vec<WorklistRow>,
    min_columns: usize,
    options: BatchOptions,
    out: &mut W,
    mut operation: F,
) -> CliResult<()>
where
    W: Write,
    F: FnMut(WorklistRow) -> Fut,
    Fut: Future<Output = Outcome>,
{
    for row in rows {
        if row.fields.len() < min_columns {
            eprintln!(
                "skipping worklist line {}: expected at least {min_columns} columns, found {}",
                row.line_number,
                row.fields.len()
            );
            continue;
        }

        let echoed = options.join(&row.fields);
        let line_number = row.line_number;
        let outcome = operation(row).await;
        if let Outcome::Error(detail) = &outcome {
            eprintln!("worklist line {line_number}: {detail}");
        }
        writeln!(out, "{echoed}{}{}", options.delimiter, outcome.tag())
            .map_err(|err| CliError::failure(anyhow!("failed to write output: {err}")))?;
        options.pace().await;
    }

    Ok(())
}
