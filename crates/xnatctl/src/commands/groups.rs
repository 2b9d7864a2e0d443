//! Worklist-driven group membership mutations.

use std::io::Write;
use std::path::Path;

use crate::batch::{BatchOptions, Outcome, process_worklist, read_worklist};
use crate::client::{CliResult, Session};
use crate::commands::users::assign_group;

/// Remove a group membership for every worklist row (project, user, group).
/// Always mutates; a membership that was already absent surfaces as the
/// server's error status.
pub(crate) async fn handle_group_remove<W: Write>(
    session: &Session,
    worklist: &Path,
    options: &BatchOptions,
    out: &mut W,
) -> CliResult<()> {
    let rows = read_worklist(worklist, options.delimiter)?;
    process_worklist(rows, 3, *options, out, |row| async move {
        remove_group(session, row.field(1), row.field(2)).await
    })
    .await
}

/// Move each worklist row's user to the target group (project, user, group).
///
/// The user's current groups are observed first: when the target membership
/// is already in place the row is `NO CHANGE` and no mutating call is made.
/// Otherwise the user's existing groups for that project are removed and the
/// target is assigned.
pub(crate) async fn handle_group_change<W: Write>(
    session: &Session,
    worklist: &Path,
    options: &BatchOptions,
    out: &mut W,
) -> CliResult<()> {
    let rows = read_worklist(worklist, options.delimiter)?;
    process_worklist(rows, 3, *options, out, |row| async move {
        let (project, login, target) = (row.field(0), row.field(1), row.field(2));

        let groups: Vec<String> = match session
            .get_json(&format!("/xapi/users/{login}/groups"))
            .await
        {
            Ok(groups) => groups,
            Err(err) => return Outcome::Error(err.display_message()),
        };

        if groups.iter().any(|group| group == target) {
            return Outcome::NoChange;
        }

        let project_prefix = format!("{project}_");
        for group in groups.iter().filter(|g| g.starts_with(&project_prefix)) {
            if let Outcome::Error(detail) = remove_group(session, login, group).await {
                return Outcome::Error(detail);
            }
        }

        match assign_group(session, login, target).await {
            Outcome::Updated => Outcome::Changed,
            other => other,
        }
    })
    .await
}

async fn remove_group(session: &Session, login: &str, group: &str) -> Outcome {
    let url = match session.url(&format!("/xapi/users/{login}/groups/{group}")) {
        Ok(url) => url,
        Err(err) => return Outcome::Error(err.display_message()),
    };
    match session.delete(url).send().await {
        Ok(response) => Outcome::from_status(response.status(), Outcome::Removed),
        Err(err) => Outcome::transport_error(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{DELETE, PUT};
    use httpmock::prelude::*;
    use reqwest::{Client, Url};
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use uuid::Uuid;

    fn anonymous_session(server: &MockServer) -> Session {
        let base_url: Url = server.base_url().parse().expect("valid URL");
        Session::anonymous(Client::new(), base_url)
    }

    fn options() -> BatchOptions {
        BatchOptions {
            delimiter: '\t',
            pacing: Duration::ZERO,
        }
    }

    fn temp_worklist(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "xnatctl-test-{}-{}-{name}",
            std::process::id(),
            Uuid::new_v4()
        ));
        fs::write(&path, contents).expect("write worklist");
        path
    }

    #[tokio::test]
    async fn group_remove_tags_success_rows_removed() {
        let server = MockServer::start_async().await;
        let removal = server.mock(|when, then| {
            when.method(DELETE).path("/xapi/users/user1/groups/groupX");
            then.status(200);
        });

        let worklist = temp_worklist("remove.tsv", "projA\tuser1\tgroupX\n");
        let session = anonymous_session(&server);
        let mut out = Vec::new();
        handle_group_remove(&session, &worklist, &options(), &mut out)
            .await
            .expect("batch should succeed");
        let _ = fs::remove_file(&worklist);

        let text = String::from_utf8(out).expect("utf-8 output");
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["projA\tuser1\tgroupX\tREMOVED"]
        );
        removal.assert();
    }

    #[tokio::test]
    async fn group_remove_failure_tags_error_and_continues() {
        let server = MockServer::start_async().await;
        let missing = server.mock(|when, then| {
            when.method(DELETE).path("/xapi/users/user1/groups/groupX");
            then.status(404);
        });
        let present = server.mock(|when, then| {
            when.method(DELETE).path("/xapi/users/user2/groups/groupY");
            then.status(200);
        });

        let worklist = temp_worklist(
            "remove-mixed.tsv",
            "projA\tuser1\tgroupX\nprojB\tuser2\tgroupY\n",
        );
        let session = anonymous_session(&server);
        let mut out = Vec::new();
        handle_group_remove(&session, &worklist, &options(), &mut out)
            .await
            .expect("batch should succeed");
        let _ = fs::remove_file(&worklist);

        let text = String::from_utf8(out).expect("utf-8 output");
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["projA\tuser1\tgroupX\tERROR", "projB\tuser2\tgroupY\tREMOVED"]
        );
        missing.assert();
        present.assert();
    }

    #[tokio::test]
    async fn group_change_skips_rows_already_in_the_target_group() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/xapi/users/user1/groups");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!(["projA_member"]));
        });
        let mutation = server.mock(|when, then| {
            when.method(PUT).path_includes("/groups/");
            then.status(200);
        });

        let worklist = temp_worklist("change-noop.tsv", "projA\tuser1\tprojA_member\n");
        let session = anonymous_session(&server);
        let mut out = Vec::new();
        handle_group_change(&session, &worklist, &options(), &mut out)
            .await
            .expect("batch should succeed");
        let _ = fs::remove_file(&worklist);

        let text = String::from_utf8(out).expect("utf-8 output");
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["projA\tuser1\tprojA_member\tNO CHANGE"]
        );
        mutation.assert_calls(0);
    }

    #[tokio::test]
    async fn group_change_replaces_the_project_group() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/xapi/users/user1/groups");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!(["projA_collaborator", "projB_member"]));
        });
        let removal = server.mock(|when, then| {
            when.method(DELETE)
                .path("/xapi/users/user1/groups/projA_collaborator");
            then.status(200);
        });
        let assignment = server.mock(|when, then| {
            when.method(PUT).path("/xapi/users/user1/groups/projA_member");
            then.status(200);
        });
        let unrelated = server.mock(|when, then| {
            when.method(DELETE)
                .path("/xapi/users/user1/groups/projB_member");
            then.status(200);
        });

        let worklist = temp_worklist("change.tsv", "projA\tuser1\tprojA_member\n");
        let session = anonymous_session(&server);
        let mut out = Vec::new();
        handle_group_change(&session, &worklist, &options(), &mut out)
            .await
            .expect("batch should succeed");
        let _ = fs::remove_file(&worklist);

        let text = String::from_utf8(out).expect("utf-8 output");
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["projA\tuser1\tprojA_member\tCHANGED"]
        );
        removal.assert();
        assignment.assert();
        unrelated.assert_calls(0);
    }
}
