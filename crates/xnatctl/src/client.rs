//! Shared session, HTTP plumbing, and error types for the CLI.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::credentials::Credential;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
const SESSION_COOKIE: &str = "JSESSIONID";
const SESSION_PATH: &str = "/data/JSESSION";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Build the HTTP client shared by every call in one invocation. The trace
/// identifier rides along as a default `x-request-id` header.
pub(crate) fn build_client(timeout_secs: u64, trace_id: &str) -> CliResult<Client> {
    let mut default_headers = HeaderMap::new();
    let request_id = HeaderValue::from_str(trace_id)
        .map_err(|_| CliError::failure(anyhow!("trace identifier contains invalid characters")))?;
    default_headers.insert(HEADER_REQUEST_ID, request_id);

    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .default_headers(default_headers)
        .build()
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))
}

/// The single authenticated connection shared by all remote calls in one run.
///
/// Opened once via [`Session::connect`], passed explicitly into every command
/// handler, and closed on every exit path via [`Session::disconnect`].
#[derive(Debug)]
pub(crate) struct Session {
    client: Client,
    base_url: Url,
    cookie: Option<String>,
}

impl Session {
    /// Open a server session with HTTP Basic credentials. The response body
    /// is the session token, echoed back as a `JSESSIONID` cookie on every
    /// subsequent request.
    pub(crate) async fn connect(
        client: Client,
        base_url: Url,
        credential: &Credential,
    ) -> CliResult<Self> {
        if !credential.is_authenticated() {
            return Ok(Self::anonymous(client, base_url));
        }

        let url = join_url(&base_url, SESSION_PATH)?;
        let response = client
            .post(url)
            .basic_auth(&credential.user, credential.password.as_deref())
            .send()
            .await
            .map_err(|err| CliError::failure(anyhow!("request to {SESSION_PATH} failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CliError::failure(anyhow!(
                "authentication for '{}' against {base_url} failed (status {status})",
                credential.user
            )));
        }

        let token = response.text().await.map_err(|err| {
            CliError::failure(anyhow!("failed to read session token: {err}"))
        })?;

        Ok(Self {
            client,
            base_url,
            cookie: Some(format!("{SESSION_COOKIE}={}", token.trim())),
        })
    }

    /// Session without server-side state, used for anonymous access.
    pub(crate) fn anonymous(client: Client, base_url: Url) -> Self {
        Self {
            client,
            base_url,
            cookie: None,
        }
    }

    /// Resolve a path (optionally carrying a query string) against the
    /// server base URL.
    pub(crate) fn url(&self, path: &str) -> CliResult<Url> {
        join_url(&self.base_url, path)
    }

    pub(crate) fn get(&self, url: Url) -> RequestBuilder {
        self.decorate(self.client.get(url))
    }

    pub(crate) fn put(&self, url: Url) -> RequestBuilder {
        self.decorate(self.client.put(url))
    }

    pub(crate) fn delete(&self, url: Url) -> RequestBuilder {
        self.decorate(self.client.delete(url))
    }

    fn decorate(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    /// GET a JSON payload and deserialize it. Non-success statuses classify
    /// as a [`CliError::Failure`].
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> CliResult<T> {
        let url = self.url(path)?;
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|err| CliError::failure(anyhow!("request to {path} failed: {err}")))?;

        if response.status().is_success() {
            response.json::<T>().await.map_err(|err| {
                CliError::failure(anyhow!("failed to parse response from {path}: {err}"))
            })
        } else {
            Err(classify_status(path, response).await)
        }
    }

    /// GET a plain-text payload (e.g. the accessibility body).
    pub(crate) async fn get_text(&self, path: &str) -> CliResult<String> {
        let url = self.url(path)?;
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|err| CliError::failure(anyhow!("request to {path} failed: {err}")))?;

        if response.status().is_success() {
            let body = response.text().await.map_err(|err| {
                CliError::failure(anyhow!("failed to read response from {path}: {err}"))
            })?;
            Ok(body.trim().to_string())
        } else {
            Err(classify_status(path, response).await)
        }
    }

    /// Close the server session. Failures are logged, never fatal: by the
    /// time teardown runs the command outcome is already decided.
    pub(crate) async fn disconnect(&self) {
        if self.cookie.is_none() {
            return;
        }
        let Ok(url) = self.url(SESSION_PATH) else {
            return;
        };
        match self.delete(url).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(status = %response.status(), "session teardown rejected");
            }
            Err(err) => {
                tracing::warn!(error = %err, "session teardown failed");
            }
        }
    }
}

fn join_url(base: &Url, path: &str) -> CliResult<Url> {
    base.join(path)
        .map_err(|err| CliError::failure(anyhow!("invalid base URL: {err}")))
}

/// Classify a non-success HTTP response into a CLI error. XNAT error bodies
/// are plain text or HTML, so only the trimmed body and status are surfaced.
pub(crate) async fn classify_status(context: &str, response: reqwest::Response) -> CliError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        CliError::failure(anyhow!("{context}: access denied (status {status})"))
    } else if body.is_empty() {
        CliError::failure(anyhow!("{context}: request failed with status {status}"))
    } else {
        CliError::failure(anyhow!("{context}: {body} (status {status})"))
    }
}

/// Parse the server URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::DELETE;
    use httpmock::prelude::*;
    use xnatctl_api_models::{ProjectRecord, ResultSetEnvelope};

    fn credential(user: &str, password: &str) -> Credential {
        Credential {
            user: user.to_string(),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn connect_exchanges_basic_auth_for_session_cookie() {
        let server = MockServer::start_async().await;
        // "alice:secret" base64-encoded.
        let jsession = server.mock(|when, then| {
            when.method(POST)
                .path("/data/JSESSION")
                .header("authorization", "Basic YWxpY2U6c2VjcmV0");
            then.status(200).body("TOKEN123\n");
        });
        let listing = server.mock(|when, then| {
            when.method(GET)
                .path("/data/projects")
                .header("cookie", "JSESSIONID=TOKEN123");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "ResultSet": { "Result": [], "totalRecords": "0" }
                }));
        });

        let base_url: Url = server.base_url().parse().expect("valid URL");
        let session = Session::connect(Client::new(), base_url, &credential("alice", "secret"))
            .await
            .expect("connect should succeed");

        let envelope: ResultSetEnvelope<ProjectRecord> = session
            .get_json("/data/projects?format=json")
            .await
            .expect("listing should succeed");
        assert!(envelope.is_empty());

        jsession.assert();
        listing.assert();
    }

    #[tokio::test]
    async fn connect_surfaces_authentication_failure() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/data/JSESSION");
            then.status(401);
        });

        let base_url: Url = server.base_url().parse().expect("valid URL");
        let err = Session::connect(Client::new(), base_url, &credential("alice", "wrong"))
            .await
            .expect_err("connect should fail");
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("authentication"));
    }

    #[tokio::test]
    async fn anonymous_session_skips_jsession_exchange() {
        let server = MockServer::start_async().await;
        let jsession = server.mock(|when, then| {
            when.method(POST).path("/data/JSESSION");
            then.status(200).body("TOKEN");
        });

        let base_url: Url = server.base_url().parse().expect("valid URL");
        let no_user = Credential {
            user: crate::credentials::ANONYMOUS_USER.to_string(),
            password: None,
        };
        let session = Session::connect(Client::new(), base_url, &no_user)
            .await
            .expect("anonymous connect is local-only");
        session.disconnect().await;
        jsession.assert_calls(0);
    }

    #[tokio::test]
    async fn disconnect_deletes_the_session() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/data/JSESSION");
            then.status(200).body("TOKEN123");
        });
        let teardown = server.mock(|when, then| {
            when.method(DELETE)
                .path("/data/JSESSION")
                .header("cookie", "JSESSIONID=TOKEN123");
            then.status(200);
        });

        let base_url: Url = server.base_url().parse().expect("valid URL");
        let session = Session::connect(Client::new(), base_url, &credential("alice", "secret"))
            .await
            .expect("connect should succeed");
        session.disconnect().await;
        teardown.assert();
    }

    #[tokio::test]
    async fn get_text_trims_the_body() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/data/projects/projA/accessibility");
            then.status(200).body("public\n");
        });

        let base_url: Url = server.base_url().parse().expect("valid URL");
        let session = Session::anonymous(Client::new(), base_url);
        let body = session
            .get_text("/data/projects/projA/accessibility")
            .await
            .expect("text fetch should succeed");
        assert_eq!(body, "public");
    }

    #[test]
    fn parse_url_rejects_invalid_input() {
        let err = parse_url("not-a-url").expect_err("invalid URL should fail");
        assert!(err.contains("invalid URL"));
    }
}
