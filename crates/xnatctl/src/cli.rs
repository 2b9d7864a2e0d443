//! Argument parsing and command dispatch for the xnatctl binary.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand, ValueEnum};
use reqwest::Url;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::batch::BatchOptions;
use crate::client::{CliError, CliResult, Session, build_client, parse_url};
use crate::commands::{access, groups, projects, sessions, users};
use crate::credentials::{Credential, resolve_credential, resolve_extension_types};

const DEFAULT_XNAT_URL: &str = "https://cnda.wustl.edu";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    init_logging();

    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Logs go to stderr so delimited stdout stays machine-readable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let credential = resolve_credential(cli.auth.as_deref(), cli.password.as_deref());
    let credential = prompt_password_if_needed(credential)?;
    let extension_types = resolve_extension_types(cli.extension_types.as_deref());
    tracing::debug!(extension_types, user = %credential.user, "resolved connection settings");

    let options = BatchOptions {
        delimiter: cli.delimiter.as_char(),
        pacing: parse_pacing(cli.sleep)?,
    };

    let trace_id = Uuid::new_v4().to_string();
    let client = build_client(cli.timeout, &trace_id)?;
    let session = Session::connect(client, cli.xnat.clone(), &credential).await?;

    let result = run_command(&session, cli.command, &options).await;

    // Teardown runs on every exit path, including command failures.
    session.disconnect().await;
    result
}

async fn run_command(session: &Session, command: Command, options: &BatchOptions) -> CliResult<()> {
    let mut out = io::stdout().lock();
    match command {
        Command::Project(ProjectCommand::List) => {
            projects::handle_project_list(session, options).await
        }
        Command::Subject(SubjectCommand::List(args)) => {
            projects::handle_subject_list(session, &args, options).await
        }
        Command::Session(session_command) => match session_command {
            SessionCommand::List(args) => {
                sessions::handle_session_list(session, &args, options).await
            }
            SessionCommand::Delete(args) => {
                sessions::handle_session_delete(session, &args.worklist, options, &mut out).await
            }
            SessionCommand::Rename(args) => {
                sessions::handle_session_rename(session, &args.worklist, options, &mut out).await
            }
        },
        Command::User(user_command) => match user_command {
            UserCommand::Projects(args) => {
                users::handle_user_listing(session, users::UserListKind::Projects, &args, options)
                    .await
            }
            UserCommand::Groups(args) => {
                users::handle_user_listing(session, users::UserListKind::Groups, &args, options)
                    .await
            }
            UserCommand::Roles(args) => {
                users::handle_user_listing(session, users::UserListKind::Roles, &args, options)
                    .await
            }
            UserCommand::CloneGroups(args) => {
                users::handle_clone_groups(session, &args, options, &mut out).await
            }
        },
        Command::Group(group_command) => match group_command {
            GroupCommand::Remove(args) => {
                groups::handle_group_remove(session, &args.worklist, options, &mut out).await
            }
            GroupCommand::Change(args) => {
                groups::handle_group_change(session, &args.worklist, options, &mut out).await
            }
        },
        Command::Access(access_command) => match access_command {
            AccessCommand::Get(args) => {
                access::handle_access_get(session, &args.project, options).await
            }
            AccessCommand::Update(args) => {
                access::handle_access_update(session, &args.worklist, options, &mut out).await
            }
        },
    }
}

/// Prompt for a password when a real user was supplied without one and the
/// CLI is attached to a terminal. Non-interactive runs proceed without a
/// password and let the server decide.
fn prompt_password_if_needed(credential: Credential) -> CliResult<Credential> {
    if !credential.is_authenticated() || credential.password.is_some() {
        return Ok(credential);
    }
    if !io::stdin().is_terminal() {
        return Ok(credential);
    }

    let prompt = format!("Password for {}: ", credential.user);
    let password = rpassword::prompt_password(prompt)
        .map_err(|err| CliError::failure(anyhow!("failed to read password: {err}")))?;
    Ok(Credential {
        password: Some(password),
        ..credential
    })
}

fn parse_pacing(sleep: Option<f64>) -> CliResult<Duration> {
    match sleep {
        None => Ok(Duration::ZERO),
        Some(secs) => Duration::try_from_secs_f64(secs).map_err(|_| {
            CliError::validation(format!(
                "--sleep must be a non-negative number of seconds a duration can hold, got {secs}"
            ))
        }),
    }
}

#[derive(Parser)]
#[command(name = "xnatctl", about = "Administrative CLI for an XNAT server")]
pub(crate) struct Cli {
    #[arg(
        short = 'x',
        long = "xnat",
        global = true,
        env = "XNAT_URL",
        value_parser = parse_url,
        default_value = DEFAULT_XNAT_URL,
        help = "URL of the XNAT server"
    )]
    xnat: Url,
    #[arg(
        short = 'u',
        long,
        global = true,
        env = "XNAT_AUTH",
        help = "Login for the XNAT server, as user or user:password"
    )]
    auth: Option<String>,
    #[arg(long, global = true, env = "XNAT_PASSWORD", help = "Password when --auth carries only a user")]
    password: Option<String>,
    #[arg(
        short = 'e',
        long = "extension-types",
        global = true,
        help = "True or False for server type extensions"
    )]
    extension_types: Option<String>,
    #[arg(
        long,
        global = true,
        env = "XNAT_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Per-request timeout in seconds"
    )]
    timeout: u64,
    #[arg(
        short = 's',
        long,
        global = true,
        help = "Seconds to pause after each REST call (fractions allowed)"
    )]
    sleep: Option<f64>,
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = Delimiter::Tab,
        help = "Field delimiter for worklists and output"
    )]
    delimiter: Delimiter,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub(crate) enum Delimiter {
    #[default]
    Tab,
    Comma,
}

impl Delimiter {
    pub(crate) const fn as_char(self) -> char {
        match self {
            Self::Tab => '\t',
            Self::Comma => ',',
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Project listings.
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Subject listings.
    #[command(subcommand)]
    Subject(SubjectCommand),
    /// Imaging session listings and worklist mutations.
    #[command(subcommand)]
    Session(SessionCommand),
    /// Per-user group, role, and project reporting.
    #[command(subcommand)]
    User(UserCommand),
    /// Worklist-driven group membership mutations.
    #[command(subcommand)]
    Group(GroupCommand),
    /// Project accessibility reporting and updates.
    #[command(subcommand)]
    Access(AccessCommand),
}

#[derive(Subcommand)]
pub(crate) enum ProjectCommand {
    /// List projects with subject/experiment counts and PI.
    List,
}

#[derive(Subcommand)]
pub(crate) enum SubjectCommand {
    /// List subjects, optionally scoped to one project.
    List(SubjectListArgs),
}

#[derive(Args, Default)]
pub(crate) struct SubjectListArgs {
    #[arg(long, help = "Restrict the listing to one project")]
    pub(crate) project: Option<String>,
}

#[derive(Subcommand)]
pub(crate) enum SessionCommand {
    /// List sessions, from the server or from a worklist.
    List(SessionListArgs),
    /// Delete every session named in a worklist (project, session).
    Delete(WorklistArgs),
    /// Relabel every session named in a worklist (project, session, new label).
    Rename(WorklistArgs),
}

#[derive(Args, Default)]
pub(crate) struct SessionListArgs {
    #[arg(long, help = "Restrict the listing to one project")]
    pub(crate) project: Option<String>,
    #[arg(short, long, help = "List in brief format")]
    pub(crate) brief: bool,
    #[arg(short = 'w', long, help = "Worklist of (project, session) rows to fetch")]
    pub(crate) worklist: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum UserCommand {
    /// List the projects a user belongs to (groups with the role stripped).
    Projects(UserListArgs),
    /// List a user's groups.
    Groups(UserListArgs),
    /// List a user's roles.
    Roles(UserListArgs),
    /// Copy one user's group memberships onto another user.
    CloneGroups(CloneGroupsArgs),
}

#[derive(Args)]
pub(crate) struct UserListArgs {
    #[arg(short = 't', long, help = "Login of the user to report on")]
    pub(crate) login: String,
    #[arg(short, long, help = "Prefix each line with index and total")]
    pub(crate) verbose: bool,
}

#[derive(Args)]
pub(crate) struct CloneGroupsArgs {
    #[arg(long, help = "Login of the user whose groups are copied")]
    pub(crate) from: String,
    #[arg(long, help = "Login of the user receiving the groups")]
    pub(crate) to: String,
}

#[derive(Subcommand)]
pub(crate) enum GroupCommand {
    /// Remove group memberships from a worklist (project, user, group).
    Remove(WorklistArgs),
    /// Move users to a target group from a worklist (project, user, group).
    Change(WorklistArgs),
}

#[derive(Subcommand)]
pub(crate) enum AccessCommand {
    /// Print one project's accessibility state.
    Get(AccessGetArgs),
    /// Update accessibility from a worklist (project, accessibility).
    Update(WorklistArgs),
}

#[derive(Args)]
pub(crate) struct AccessGetArgs {
    #[arg(long, help = "Project identifier")]
    pub(crate) project: String,
}

#[derive(Args)]
pub(crate) struct WorklistArgs {
    #[arg(short = 'w', long, help = "Delimited worklist file")]
    pub(crate) worklist: PathBuf,
}
