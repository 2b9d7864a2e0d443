//! Project and subject listings.

use xnatctl_api_models::{ProjectRecord, ResultSetEnvelope, SubjectRecord};

use crate::batch::BatchOptions;
use crate::cli::SubjectListArgs;
use crate::client::{CliResult, Session};
use crate::output::{PROJECT_HEADER, SUBJECT_HEADER, count_or_unknown, join_fields};

/// List every project with subject/experiment counts and PI.
pub(crate) async fn handle_project_list(
    session: &Session,
    options: &BatchOptions,
) -> CliResult<()> {
    println!("{}", join_fields(&PROJECT_HEADER, options.delimiter));

    let listing: ResultSetEnvelope<ProjectRecord> =
        session.get_json("/data/projects?format=json").await?;

    for project in listing.into_rows() {
        let subject_count = count_rows(session, &project.id, "subjects").await;
        let experiment_count = count_rows(session, &project.id, "experiments").await;
        println!(
            "{}",
            join_fields(
                &[
                    project.id.as_str(),
                    project.name.as_str(),
                    project.insert_date.as_str(),
                    &count_or_unknown(subject_count),
                    &count_or_unknown(experiment_count),
                    &project.pi(),
                ],
                options.delimiter
            )
        );
        options.pace().await;
    }

    Ok(())
}

/// List subjects, either for one project or across all projects.
pub(crate) async fn handle_subject_list(
    session: &Session,
    args: &SubjectListArgs,
    options: &BatchOptions,
) -> CliResult<()> {
    println!("{}", join_fields(&SUBJECT_HEADER, options.delimiter));

    let project_ids = match &args.project {
        Some(project) => vec![project.clone()],
        None => {
            let listing: ResultSetEnvelope<ProjectRecord> =
                session.get_json("/data/projects?format=json").await?;
            listing.into_rows().into_iter().map(|p| p.id).collect()
        }
    };

    for project_id in project_ids {
        let listing: ResultSetEnvelope<SubjectRecord> = session
            .get_json(&format!("/data/projects/{project_id}/subjects?format=json"))
            .await?;
        for subject in listing.into_rows() {
            println!(
                "{}",
                join_fields(
                    &[
                        project_id.as_str(),
                        subject.id.as_str(),
                        subject.label.as_str(),
                        subject.insert_date.as_str(),
                    ],
                    options.delimiter
                )
            );
        }
        options.pace().await;
    }

    Ok(())
}

/// Count the rows of a per-project sub-listing; a failed fetch degrades to
/// `None` (rendered `Unknown`) instead of aborting the listing.
async fn count_rows(session: &Session, project_id: &str, collection: &str) -> Option<usize> {
    let path = format!("/data/projects/{project_id}/{collection}?format=json");
    match session
        .get_json::<ResultSetEnvelope<serde::de::IgnoredAny>>(&path)
        .await
    {
        Ok(listing) => Some(listing.len()),
        Err(err) => {
            tracing::debug!(project_id, collection, error = %err.display_message(), "count fetch failed");
            None
        }
    }
}
