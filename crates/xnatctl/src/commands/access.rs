//! Project accessibility reporting and worklist-driven updates.

use std::io::Write;
use std::path::Path;

use xnatctl_api_models::Accessibility;

use crate::batch::{BatchOptions, Outcome, process_worklist, read_worklist};
use crate::client::{CliResult, Session};
use crate::output::join_fields;

/// Print one project's accessibility state. The endpoint returns the state
/// as a plain-text body rather than JSON.
pub(crate) async fn handle_access_get(
    session: &Session,
    project: &str,
    options: &BatchOptions,
) -> CliResult<()> {
    let value = session
        .get_text(&format!("/data/projects/{project}/accessibility"))
        .await?;
    println!("{}", join_fields(&[project, value.as_str()], options.delimiter));
    Ok(())
}

/// Update accessibility for every worklist row (project, accessibility).
///
/// The current state is observed first: a row that already matches is
/// `NO CHANGE` and issues no mutating call. A row naming an unknown state is
/// `ERROR` without touching the server.
pub(crate) async fn handle_access_update<W: Write>(
    session: &Session,
    worklist: &Path,
    options: &BatchOptions,
    out: &mut W,
) -> CliResult<()> {
    let rows = read_worklist(worklist, options.delimiter)?;
    process_worklist(rows, 2, *options, out, |row| async move {
        let project = row.field(0);
        let target = match row.field(1).parse::<Accessibility>() {
            Ok(target) => target,
            Err(err) => return Outcome::Error(err.to_string()),
        };

        let current = match session
            .get_text(&format!("/data/projects/{project}/accessibility"))
            .await
        {
            Ok(current) => current,
            Err(err) => return Outcome::Error(err.display_message()),
        };
        if current == target.as_str() {
            return Outcome::NoChange;
        }

        let path = format!("/data/projects/{project}/accessibility/{target}");
        let url = match session.url(&path) {
            Ok(url) => url,
            Err(err) => return Outcome::Error(err.display_message()),
        };
        match session.put(url).send().await {
            Ok(response) => Outcome::from_status(response.status(), Outcome::Updated),
            Err(err) => Outcome::transport_error(&err),
        }
    })
    .await
}
