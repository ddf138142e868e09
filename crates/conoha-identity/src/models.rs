//! Request documents and credentials for the token exchange.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

/// Password credentials scoped to a tenant.
///
/// The password is held in a [`SecretString`] and only exposed while the
/// request document is serialized.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// User and tenant addressed by id.
    ById {
        /// User id
        user_id: String,
        /// API password
        password: SecretString,
        /// Tenant (project) id
        tenant_id: String,
    },
    /// User and tenant addressed by name.
    ByName {
        /// User name
        user_name: String,
        /// API password
        password: SecretString,
        /// Tenant (project) name
        tenant_name: String,
    },
}

impl Credentials {
    /// Credentials for the id-based exchange.
    pub fn by_id(
        user_id: impl Into<String>,
        password: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self::ById {
            user_id: user_id.into(),
            password: SecretString::from(password.into()),
            tenant_id: tenant_id.into(),
        }
    }

    /// Credentials for the name-based exchange.
    pub fn by_name(
        user_name: impl Into<String>,
        password: impl Into<String>,
        tenant_name: impl Into<String>,
    ) -> Self {
        Self::ByName {
            user_name: user_name.into(),
            password: SecretString::from(password.into()),
            tenant_name: tenant_name.into(),
        }
    }

    /// Build the auth document for these credentials.
    #[must_use]
    pub fn to_request(&self) -> AuthRequest<'_> {
        match self {
            Self::ById {
                user_id,
                password,
                tenant_id,
            } => AuthRequest::by_id(user_id, password.expose_secret(), tenant_id),
            Self::ByName {
                user_name,
                password,
                tenant_name,
            } => AuthRequest::by_name(user_name, password.expose_secret(), tenant_name),
        }
    }
}

/// Body of `POST /v3/auth/tokens`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest<'a> {
    auth: Auth<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct Auth<'a> {
    identity: Identity<'a>,
    scope: Scope<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct Identity<'a> {
    methods: [&'static str; 1],
    password: PasswordMethod<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct PasswordMethod<'a> {
    user: UserRef<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct UserRef<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct Scope<'a> {
    project: ProjectRef<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct ProjectRef<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> AuthRequest<'a> {
    /// Auth document addressing user and tenant by id.
    #[must_use]
    pub fn by_id(user_id: &'a str, password: &'a str, tenant_id: &'a str) -> Self {
        Self::build(
            UserRef {
                id: Some(user_id),
                name: None,
                password,
            },
            ProjectRef {
                id: Some(tenant_id),
                name: None,
            },
        )
    }

    /// Auth document addressing user and tenant by name.
    #[must_use]
    pub fn by_name(user_name: &'a str, password: &'a str, tenant_name: &'a str) -> Self {
        Self::build(
            UserRef {
                id: None,
                name: Some(user_name),
                password,
            },
            ProjectRef {
                id: None,
                name: Some(tenant_name),
            },
        )
    }

    fn build(user: UserRef<'a>, project: ProjectRef<'a>) -> Self {
        Self {
            auth: Auth {
                identity: Identity {
                    methods: ["password"],
                    password: PasswordMethod { user },
                },
                scope: Scope { project },
            },
        }
    }
}
