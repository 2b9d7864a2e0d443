//! Pure credential resolution from overlapping CLI fields.
//!
//! The auth flag accepts either a bare login or a combined `user:password`
//! token; a separate password flag may fill the gap. Resolution is free of
//! side effects so it can be unit-tested without network access.

/// Sentinel login used when no user-identifying field is present.
pub(crate) const ANONYMOUS_USER: &str = "NoUser";

/// Effective login derived once per invocation; immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Credential {
    pub(crate) user: String,
    pub(crate) password: Option<String>,
}

impl Credential {
    /// Whether a real user (not the sentinel) was supplied.
    pub(crate) fn is_authenticated(&self) -> bool {
        self.user != ANONYMOUS_USER
    }
}

/// Derive the effective user and password.
///
/// Precedence: a `user:password` auth token wins outright; a bare auth token
/// falls back to the separate password field; no auth token resolves to the
/// [`ANONYMOUS_USER`] sentinel with no password.
pub(crate) fn resolve_credential(auth: Option<&str>, password: Option<&str>) -> Credential {
    let Some(raw) = auth else {
        return Credential {
            user: ANONYMOUS_USER.to_string(),
            password: None,
        };
    };

    match raw.split_once(':') {
        Some((user, combined_password)) => Credential {
            user: user.to_string(),
            password: Some(combined_password.to_string()),
        },
        None => Credential {
            user: raw.to_string(),
            password: password.map(str::to_string),
        },
    }
}

/// Resolve the extension-types capability flag: only the literal `True`
/// enables it.
pub(crate) fn resolve_extension_types(raw: Option<&str>) -> bool {
    raw == Some("True")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_token_yields_user_and_password() {
        let credential = resolve_credential(Some("alice:secret"), None);
        assert_eq!(credential.user, "alice");
        assert_eq!(credential.password.as_deref(), Some("secret"));
        assert!(credential.is_authenticated());
    }

    #[test]
    fn combined_token_overrides_separate_password() {
        let credential = resolve_credential(Some("alice:secret"), Some("ignored"));
        assert_eq!(credential.password.as_deref(), Some("secret"));
    }

    #[test]
    fn bare_user_falls_back_to_separate_password() {
        let credential = resolve_credential(Some("bob"), Some("pw"));
        assert_eq!(credential.user, "bob");
        assert_eq!(credential.password.as_deref(), Some("pw"));
    }

    #[test]
    fn bare_user_without_password_has_none() {
        let credential = resolve_credential(Some("bob"), None);
        assert_eq!(credential.user, "bob");
        assert_eq!(credential.password, None);
    }

    #[test]
    fn missing_auth_resolves_to_sentinel() {
        let credential = resolve_credential(None, Some("pw"));
        assert_eq!(credential.user, ANONYMOUS_USER);
        assert_eq!(credential.password, None);
        assert!(!credential.is_authenticated());
    }

    #[test]
    fn trailing_colon_keeps_empty_password() {
        let credential = resolve_credential(Some("alice:"), Some("pw"));
        assert_eq!(credential.user, "alice");
        assert_eq!(credential.password.as_deref(), Some(""));
    }

    #[test]
    fn extension_types_requires_the_literal_true() {
        assert!(resolve_extension_types(Some("True")));
        assert!(!resolve_extension_types(Some("true")));
        assert!(!resolve_extension_types(Some("False")));
        assert!(!resolve_extension_types(None));
    }
}
