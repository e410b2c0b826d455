//! Access policy for back-office navigation
//!
//! Every navigation is decided afresh from the session token it carries:
//! - paths that are neither protected nor auth pages pass without a lookup
//! - no session on a protected path sends the visitor to the login page
//! - a signed-in user on the login or register page goes home
//! - a signed-in user whose profile role is not an allowed staff role is
//!   signed out and sent to the login page
//!
//! The role is read through a privileged lookup, so row-level security on the
//! profile table does not hide it. Any failure to establish the role counts
//! as "not allowed".

use crate::core::error::AdminResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Access level on a user's profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Master,
    User,
    /// Missing, unknown or unreadable role
    None,
}

impl Role {
    /// Parse a role tag; anything unrecognised is [`Role::None`]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "master" => Role::Master,
            "user" => Role::User,
            _ => Role::None,
        }
    }
}

/// The signed-in user behind a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Where a navigation goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessOutcome {
    Allow,
    RedirectLogin,
    RedirectHome,
}

/// Result of evaluating one navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub authenticated: bool,
    pub role: Role,
    pub outcome: AccessOutcome,
    /// The session was signed out as part of this decision
    pub session_terminated: bool,
}

impl AccessDecision {
    fn anonymous(outcome: AccessOutcome) -> Self {
        Self {
            authenticated: false,
            role: Role::None,
            outcome,
            session_terminated: false,
        }
    }

    fn authenticated(role: Role, outcome: AccessOutcome) -> Self {
        Self {
            authenticated: true,
            role,
            outcome,
            session_terminated: false,
        }
    }
}

/// Identity service consulted by the gate
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The user behind `access_token`, or `None` if the token is not a live session
    async fn current_user(&self, access_token: &str) -> AdminResult<Option<SessionUser>>;

    /// Role tag on the user's profile, read with privileges that bypass row-level security
    async fn lookup_role(&self, user_id: &str) -> AdminResult<Option<String>>;

    /// End the session behind `access_token`
    async fn sign_out(&self, access_token: &str) -> AdminResult<()>;
}

fn default_protected_paths() -> Vec<String> {
    [
        "/",
        "/reports",
        "/claims",
        "/amenities",
        "/categories",
        "/services",
        "/cities",
        "/states",
        "/images",
        "/comments",
        "/photos",
        "/emails",
        "/users",
        "/api",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_auth_paths() -> Vec<String> {
    vec!["/login".to_string(), "/register".to_string()]
}

fn default_allowed_roles() -> Vec<Role> {
    vec![Role::Admin, Role::Master]
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_home_path() -> String {
    "/".to_string()
}

/// Which paths are guarded and who may pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    #[serde(default = "default_protected_paths")]
    pub protected_paths: Vec<String>,

    #[serde(default = "default_auth_paths")]
    pub auth_paths: Vec<String>,

    #[serde(default = "default_allowed_roles")]
    pub allowed_roles: Vec<Role>,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default = "default_home_path")]
    pub home_path: String,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            protected_paths: default_protected_paths(),
            auth_paths: default_auth_paths(),
            allowed_roles: default_allowed_roles(),
            login_path: default_login_path(),
            home_path: default_home_path(),
        }
    }
}

impl AccessPolicy {
    /// Whether `path` is an entry of the protected set or lies beneath one
    ///
    /// `/` only protects itself.
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_paths.iter().any(|entry| {
            let entry = entry.trim_end_matches('/');
            if entry.is_empty() {
                return path == "/";
            }
            path == entry
                || path
                    .strip_prefix(entry)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    pub fn is_auth_path(&self, path: &str) -> bool {
        self.auth_paths.iter().any(|p| p == path)
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }
}

/// Per-navigation access gate
#[derive(Clone)]
pub struct AccessPolicyGate {
    policy: AccessPolicy,
    provider: Arc<dyn SessionProvider>,
}

impl AccessPolicyGate {
    pub fn new(policy: AccessPolicy, provider: Arc<dyn SessionProvider>) -> Self {
        Self { policy, provider }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Decide one navigation to `path` carrying `access_token`
    pub async fn evaluate(&self, path: &str, access_token: Option<&str>) -> AccessDecision {
        let protected = self.policy.is_protected(path);
        if !protected && !self.policy.is_auth_path(path) {
            return AccessDecision::anonymous(AccessOutcome::Allow);
        }

        let session = match access_token.filter(|t| !t.is_empty()) {
            Some(token) => match self.provider.current_user(token).await {
                Ok(Some(user)) => Some((token, user)),
                Ok(None) => None,
                Err(e) => {
                    tracing::debug!(error = %e, "session lookup failed, treating as signed out");
                    None
                }
            },
            None => None,
        };

        let Some((token, user)) = session else {
            let outcome = if protected {
                AccessOutcome::RedirectLogin
            } else {
                AccessOutcome::Allow
            };
            tracing::debug!(path = %path, ?outcome, "anonymous navigation");
            return AccessDecision::anonymous(outcome);
        };

        if self.policy.is_auth_path(path) {
            return AccessDecision::authenticated(Role::None, AccessOutcome::RedirectHome);
        }

        let role = match self.provider.lookup_role(&user.id).await {
            Ok(Some(tag)) => Role::parse(&tag),
            Ok(None) => Role::None,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "role lookup failed");
                Role::None
            }
        };

        if self.policy.allows(role) {
            tracing::debug!(path = %path, user_id = %user.id, ?role, "navigation allowed");
            return AccessDecision::authenticated(role, AccessOutcome::Allow);
        }

        tracing::warn!(
            path = %path,
            user_id = %user.id,
            ?role,
            "role not allowed in back office, signing out"
        );
        if let Err(e) = self.provider.sign_out(token).await {
            tracing::warn!(user_id = %user.id, error = %e, "sign-out failed");
        }
        AccessDecision {
            session_terminated: true,
            ..AccessDecision::authenticated(role, AccessOutcome::RedirectLogin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{AdminError, StorageError};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubProvider {
        users: HashMap<String, SessionUser>,
        roles: HashMap<String, String>,
        failing_roles: bool,
        user_lookups: Mutex<usize>,
        signed_out: Mutex<Vec<String>>,
    }

    impl StubProvider {
        fn with_user(mut self, token: &str, id: &str, role: Option<&str>) -> Self {
            self.users.insert(
                token.to_string(),
                SessionUser {
                    id: id.to_string(),
                    email: None,
                },
            );
            if let Some(role) = role {
                self.roles.insert(id.to_string(), role.to_string());
            }
            self
        }
    }

    #[async_trait]
    impl SessionProvider for StubProvider {
        async fn current_user(&self, token: &str) -> AdminResult<Option<SessionUser>> {
            *self.user_lookups.lock().unwrap() += 1;
            Ok(self.users.get(token).cloned())
        }

        async fn lookup_role(&self, user_id: &str) -> AdminResult<Option<String>> {
            if self.failing_roles {
                return Err(AdminError::Storage(StorageError::Transport {
                    message: "connection reset".to_string(),
                }));
            }
            Ok(self.roles.get(user_id).cloned())
        }

        async fn sign_out(&self, token: &str) -> AdminResult<()> {
            self.signed_out.lock().unwrap().push(token.to_string());
            Ok(())
        }
    }

    fn gate(provider: StubProvider) -> (AccessPolicyGate, Arc<StubProvider>) {
        let provider = Arc::new(provider);
        (
            AccessPolicyGate::new(AccessPolicy::default(), provider.clone()),
            provider,
        )
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse(" Master "), Role::Master);
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(Role::parse("moderator"), Role::None);
    }

    #[test]
    fn test_protected_path_matching() {
        let policy = AccessPolicy::default();
        assert!(policy.is_protected("/"));
        assert!(policy.is_protected("/reports"));
        assert!(policy.is_protected("/reports/42"));
        assert!(policy.is_protected("/api/amenities"));
        assert!(!policy.is_protected("/reportsarchive"));
        assert!(!policy.is_protected("/login"));
        assert!(!policy.is_protected("/health"));
    }

    #[tokio::test]
    async fn test_anonymous_on_protected_path_redirects_to_login() {
        let (gate, _) = gate(StubProvider::default());
        for path in AccessPolicy::default().protected_paths {
            let decision = gate.evaluate(&path, None).await;
            assert_eq!(decision.outcome, AccessOutcome::RedirectLogin, "{path}");
            assert!(!decision.authenticated);
        }
    }

    #[tokio::test]
    async fn test_anonymous_on_open_path_is_allowed() {
        let (gate, _) = gate(StubProvider::default());
        assert_eq!(
            gate.evaluate("/login", None).await.outcome,
            AccessOutcome::Allow
        );
    }

    #[tokio::test]
    async fn test_open_path_skips_session_lookup() {
        let (gate, provider) = gate(StubProvider::default().with_user("t", "u1", Some("admin")));
        for path in ["/health", "/healthz", "/reportsarchive"] {
            let decision = gate.evaluate(path, Some("t")).await;
            assert_eq!(decision.outcome, AccessOutcome::Allow, "{path}");
        }
        assert_eq!(*provider.user_lookups.lock().unwrap(), 0);

        gate.evaluate("/login", Some("t")).await;
        assert_eq!(*provider.user_lookups.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_token_is_anonymous() {
        let (gate, provider) = gate(StubProvider::default());
        let decision = gate.evaluate("/reports", Some("stale")).await;
        assert_eq!(decision.outcome, AccessOutcome::RedirectLogin);
        assert!(!decision.session_terminated);
        assert!(provider.signed_out.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_signed_in_user_on_auth_page_goes_home() {
        let (gate, _) = gate(StubProvider::default().with_user("t", "u1", Some("admin")));
        let decision = gate.evaluate("/register", Some("t")).await;
        assert_eq!(decision.outcome, AccessOutcome::RedirectHome);
        assert!(decision.authenticated);
    }

    #[tokio::test]
    async fn test_staff_roles_are_allowed() {
        let (gate, _) = gate(
            StubProvider::default()
                .with_user("a", "u1", Some("admin"))
                .with_user("m", "u2", Some("master")),
        );
        let decision = gate.evaluate("/claims", Some("a")).await;
        assert_eq!(decision.outcome, AccessOutcome::Allow);
        assert_eq!(decision.role, Role::Admin);

        let decision = gate.evaluate("/claims/7", Some("m")).await;
        assert_eq!(decision.outcome, AccessOutcome::Allow);
        assert_eq!(decision.role, Role::Master);
    }

    #[tokio::test]
    async fn test_plain_user_is_signed_out() {
        let (gate, provider) = gate(StubProvider::default().with_user("t", "u1", Some("user")));
        let decision = gate.evaluate("/reports", Some("t")).await;
        assert_eq!(decision.outcome, AccessOutcome::RedirectLogin);
        assert_eq!(decision.role, Role::User);
        assert!(decision.session_terminated);
        assert_eq!(*provider.signed_out.lock().unwrap(), vec!["t".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_profile_fails_closed() {
        let (gate, _) = gate(StubProvider::default().with_user("t", "u1", None));
        let decision = gate.evaluate("/", Some("t")).await;
        assert_eq!(decision.outcome, AccessOutcome::RedirectLogin);
        assert!(decision.session_terminated);
    }

    #[tokio::test]
    async fn test_failed_role_lookup_fails_closed() {
        let mut provider = StubProvider::default().with_user("t", "u1", Some("admin"));
        provider.failing_roles = true;
        let (gate, provider) = gate(provider);

        let decision = gate.evaluate("/amenities", Some("t")).await;
        assert_eq!(decision.outcome, AccessOutcome::RedirectLogin);
        assert_eq!(decision.role, Role::None);
        assert!(decision.session_terminated);
        assert_eq!(provider.signed_out.lock().unwrap().len(), 1);
    }
}
