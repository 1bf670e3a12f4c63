use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(rename = "googleId", default)]
    pub google_id: Option<String>,
}

/// Result of a credential exchange: who signed in and the bearer token to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user: SessionUser,
    #[serde(rename = "accessToken", alias = "access_token", default)]
    pub access_token: Option<String>,
}

impl AuthenticatedUser {
    pub fn display_name(&self) -> &str {
        self.user
            .name
            .as_deref()
            .or(self.user.email.as_deref())
            .unwrap_or("player")
    }
}

/// Holds at most one signed-in user.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Option<AuthenticatedUser>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(user: Option<AuthenticatedUser>, is_authenticated: bool) -> Self {
        Self {
            current: user.filter(|_| is_authenticated),
        }
    }

    pub fn login(&mut self, user: AuthenticatedUser) {
        self.current = Some(user);
    }

    pub fn logout(&mut self) {
        self.current = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.current.as_ref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.current.as_ref().map(|u| u.user.id)
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.current
            .as_ref()
            .and_then(|u| u.access_token.as_deref())
            .filter(|t| !t.is_empty())
    }
}
