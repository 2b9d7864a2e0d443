//! Per-user group, role, and project reporting, plus group cloning.

use std::io::Write;

use anyhow::anyhow;

use crate::batch::{BatchOptions, Outcome};
use crate::cli::{CloneGroupsArgs, UserListArgs};
use crate::client::{CliError, CliResult, Session};
use crate::output::join_fields;

/// What a user listing reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UserListKind {
    /// Project identifiers, derived from groups by stripping the role suffix.
    Projects,
    /// Raw group names.
    Groups,
    /// Role names.
    Roles,
}

impl UserListKind {
    const fn endpoint(self) -> &'static str {
        match self {
            Self::Projects | Self::Groups => "groups",
            Self::Roles => "roles",
        }
    }
}

/// List one user's projects, groups, or roles, one tab-delimited line per
/// entry. Verbose mode prefixes each line with its index and the total.
pub(crate) async fn handle_user_listing(
    session: &Session,
    kind: UserListKind,
    args: &UserListArgs,
    options: &BatchOptions,
) -> CliResult<()> {
    let values: Vec<String> = session
        .get_json(&format!("/xapi/users/{}/{}", args.login, kind.endpoint()))
        .await?;
    let total = values.len().to_string();

    for (index, value) in values.iter().enumerate() {
        let value = match kind {
            UserListKind::Projects => strip_role_suffix(value),
            UserListKind::Groups | UserListKind::Roles => value.as_str(),
        };
        if args.verbose {
            let index = (index + 1).to_string();
            println!(
                "{}",
                join_fields(
                    &[index.as_str(), total.as_str(), args.login.as_str(), value],
                    options.delimiter
                )
            );
        } else {
            println!(
                "{}",
                join_fields(&[args.login.as_str(), value], options.delimiter)
            );
        }
        options.pace().await;
    }

    Ok(())
}

/// Copy every group membership of one user onto another, one outcome-tagged
/// line per group. A failed assignment never aborts the remaining groups.
pub(crate) async fn handle_clone_groups<W: Write>(
    session: &Session,
    args: &CloneGroupsArgs,
    options: &BatchOptions,
    out: &mut W,
) -> CliResult<()> {
    let groups: Vec<String> = session
        .get_json(&format!("/xapi/users/{}/groups", args.from))
        .await?;

    for group in &groups {
        let outcome = assign_group(session, &args.to, group).await;
        if let Outcome::Error(detail) = &outcome {
            eprintln!("group '{group}': {detail}");
        }
        writeln!(
            out,
            "{}",
            join_fields(
                &[
                    args.from.as_str(),
                    args.to.as_str(),
                    group.as_str(),
                    outcome.tag(),
                ],
                options.delimiter
            )
        )
        .map_err(|err| CliError::failure(anyhow!("failed to write output: {err}")))?;
        options.pace().await;
    }

    Ok(())
}

pub(crate) async fn assign_group(session: &Session, login: &str, group: &str) -> Outcome {
    let url = match session.url(&format!("/xapi/users/{login}/groups/{group}")) {
        Ok(url) => url,
        Err(err) => return Outcome::Error(err.display_message()),
    };
    match session.put(url).send().await {
        Ok(response) => Outcome::from_status(response.status(), Outcome::Updated),
        Err(err) => Outcome::transport_error(&err),
    }
}

/// A group name encodes `{project}_{role}`; the project is everything before
/// the last underscore. Names without an underscore pass through unchanged.
fn strip_role_suffix(group: &str) -> &str {
    group.rfind('_').map_or(group, |index| &group[..index])
}
