//! Imaging session listings and worklist-driven mutations.

use std::io::Write;
use std::path::Path;

use xnatctl_api_models::{ExperimentRecord, ProjectRecord, ResultSetEnvelope, ScanRecord};

use crate::batch::{BatchOptions, Outcome, process_worklist, read_worklist};
use crate::cli::SessionListArgs;
use crate::client::{CliResult, Session};
use crate::output::{SESSION_HEADER, SESSION_HEADER_BRIEF, count_or_unknown, join_fields};

const EXPERIMENT_COLUMNS: &str = "ID,label,project,subject_ID,insert_date,xsiType";

/// List sessions for every (or one) project, or fetch the sessions named in
/// a worklist of (project, session) rows.
pub(crate) async fn handle_session_list(
    session: &Session,
    args: &SessionListArgs,
    options: &BatchOptions,
) -> CliResult<()> {
    print_session_header(args.brief, options.delimiter);

    if let Some(worklist) = &args.worklist {
        let rows = read_worklist(worklist, options.delimiter)?;
        for row in rows {
            if row.fields.len() < 2 {
                eprintln!(
                    "skipping worklist line {}: expected at least 2 columns, found {}",
                    row.line_number,
                    row.fields.len()
                );
                continue;
            }
            let (project, experiment) = (row.field(0), row.field(1));
            match lookup_experiment(session, project, experiment).await {
                Ok(Some(record)) => print_session_row(session, project, &record, args.brief, options).await,
                Ok(None) => {
                    eprintln!("worklist line {}: session '{experiment}' not found in '{project}'", row.line_number);
                }
                Err(err) => {
                    eprintln!("worklist line {}: {}", row.line_number, err.display_message());
                }
            }
            options.pace().await;
        }
        return Ok(());
    }

    let project_ids = match &args.project {
        Some(project) => vec![project.clone()],
        None => {
            let listing: ResultSetEnvelope<ProjectRecord> =
                session.get_json("/data/projects?format=json").await?;
            listing.into_rows().into_iter().map(|p| p.id).collect()
        }
    };

    for project_id in project_ids {
        let listing: ResultSetEnvelope<ExperimentRecord> = session
            .get_json(&format!(
                "/data/projects/{project_id}/experiments?format=json&columns={EXPERIMENT_COLUMNS}"
            ))
            .await?;
        for record in listing.into_rows() {
            print_session_row(session, &project_id, &record, args.brief, options).await;
            options.pace().await;
        }
    }

    Ok(())
}

/// Delete every session named in a worklist of (project, session) rows.
pub(crate) async fn handle_session_delete<W: Write>(
    session: &Session,
    worklist: &Path,
    options: &BatchOptions,
    out: &mut W,
) -> CliResult<()> {
    let rows = read_worklist(worklist, options.delimiter)?;
    process_worklist(rows, 2, *options, out, |row| async move {
        let path = format!(
            "/data/projects/{}/experiments/{}?removeFiles=true",
            row.field(0),
            row.field(1)
        );
        let url = match session.url(&path) {
            Ok(url) => url,
            Err(err) => return Outcome::Error(err.display_message()),
        };
        match session.delete(url).send().await {
            Ok(response) => Outcome::from_status(response.status(), Outcome::Removed),
            Err(err) => Outcome::transport_error(&err),
        }
    })
    .await
}

/// Relabel every session named in a worklist of (project, session, new label)
/// rows. The owning subject is resolved first because the rename endpoint is
/// addressed through it.
pub(crate) async fn handle_session_rename<W: Write>(
    session: &Session,
    worklist: &Path,
    options: &BatchOptions,
    out: &mut W,
) -> CliResult<()> {
    let rows = read_worklist(worklist, options.delimiter)?;
    process_worklist(rows, 3, *options, out, |row| async move {
        let (project, experiment, new_label) = (row.field(0), row.field(1), row.field(2));
        let record = match lookup_experiment(session, project, experiment).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                return Outcome::Error(format!(
                    "session '{experiment}' not found in '{project}'"
                ));
            }
            Err(err) => return Outcome::Error(err.display_message()),
        };

        let path = format!(
            "/data/projects/{project}/subjects/{}/experiments/{}",
            record.subject_id, record.id
        );
        let url = match session.url(&path) {
            Ok(url) => url,
            Err(err) => return Outcome::Error(err.display_message()),
        };
        match session
            .put(url)
            .query(&[("label", new_label)])
            .send()
            .await
        {
            Ok(response) => Outcome::from_status(response.status(), Outcome::Changed),
            Err(err) => Outcome::transport_error(&err),
        }
    })
    .await
}

/// Resolve one experiment by accession ID, falling back to a label lookup.
async fn lookup_experiment(
    session: &Session,
    project: &str,
    experiment: &str,
) -> CliResult<Option<ExperimentRecord>> {
    let by_id: ResultSetEnvelope<ExperimentRecord> = session
        .get_json(&format!(
            "/data/experiments?format=json&project={project}&ID={experiment}&columns={EXPERIMENT_COLUMNS}"
        ))
        .await?;
    if let Some(record) = by_id.into_rows().into_iter().next() {
        return Ok(Some(record));
    }

    let by_label: ResultSetEnvelope<ExperimentRecord> = session
        .get_json(&format!(
            "/data/experiments?format=json&project={project}&label={experiment}&columns={EXPERIMENT_COLUMNS}"
        ))
        .await?;
    Ok(by_label.into_rows().into_iter().next())
}

fn print_session_header(brief: bool, delimiter: char) {
    if brief {
        println!("{}", join_fields(&SESSION_HEADER_BRIEF, delimiter));
    } else {
        println!("{}", join_fields(&SESSION_HEADER, delimiter));
    }
}

async fn print_session_row(
    session: &Session,
    project: &str,
    record: &ExperimentRecord,
    brief: bool,
    options: &BatchOptions,
) {
    if brief {
        println!(
            "{}",
            join_fields(
                &[project, record.id.as_str(), record.label.as_str()],
                options.delimiter
            )
        );
        return;
    }

    let scan_count = count_scans(session, &record.id).await;
    println!(
        "{}",
        join_fields(
            &[
                project,
                record.id.as_str(),
                record.label.as_str(),
                record.insert_date.as_str(),
                &record.modality(),
                &count_or_unknown(scan_count),
            ],
            options.delimiter
        )
    );
}

async fn count_scans(session: &Session, experiment_id: &str) -> Option<usize> {
    let path = format!("/data/experiments/{experiment_id}/scans?format=json");
    match session
        .get_json::<ResultSetEnvelope<ScanRecord>>(&path)
        .await
    {
        Ok(listing) => Some(listing.len()),
        Err(err) => {
            tracing::debug!(experiment_id, error = %err.display_message(), "scan count fetch failed");
            None
        }
    }
}
