use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The single current role of a user.
///
/// Roles are a closed set with no ordering between them: which roles may
/// perform an operation is decided by the whitelists in
/// [`crate::authz::whitelists`], never by comparing roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Unassigned,
    #[serde(rename = "PSO")]
    Pso,
    Employee,
    ContactManager,
    Supervisor,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Unassigned,
        Role::Pso,
        Role::Employee,
        Role::ContactManager,
        Role::Supervisor,
        Role::Admin,
        Role::SuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unassigned => "Unassigned",
            Role::Pso => "PSO",
            Role::Employee => "Employee",
            Role::ContactManager => "ContactManager",
            Role::Supervisor => "Supervisor",
            Role::Admin => "Admin",
            Role::SuperAdmin => "SuperAdmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// A user as resolved by the identity store. Read-only from the policy
/// core's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// External identity supplied by the transport layer.
    pub caller_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker. A set value fails every enforcement check.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(caller_id: impl Into<String>, email: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            caller_id: caller_id.into(),
            email: email.into(),
            name: name.into(),
            role,
            supervisor_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn with_supervisor(mut self, supervisor_id: Uuid) -> Self {
        self.supervisor_id = Some(supervisor_id);
        self
    }

    pub fn deleted(mut self) -> Self {
        self.deleted_at = Some(Utc::now());
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_canonical_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!("PSO".parse::<Role>(), Ok(Role::Pso));
    }

    #[test]
    fn role_rejects_unknown_and_case_variants() {
        assert_eq!("admin".parse::<Role>(), Err(UnknownRole("admin".to_string())));
        assert!("Pso".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_as_canonical_name() {
        assert_eq!(serde_json::to_string(&Role::Pso).unwrap(), "\"PSO\"");
        assert_eq!(serde_json::to_string(&Role::ContactManager).unwrap(), "\"ContactManager\"");
        let back: Role = serde_json::from_str("\"SuperAdmin\"").unwrap();
        assert_eq!(back, Role::SuperAdmin);
    }

    #[test]
    fn deleted_marker_is_reported() {
        let user = User::new("ext-1", "a@example.com", "A", Role::Admin);
        assert!(!user.is_deleted());
        assert!(user.deleted().is_deleted());
    }
}
