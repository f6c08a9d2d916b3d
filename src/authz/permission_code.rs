use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// A validated `resource:action` permission code.
///
/// Validation happens once, at construction: the code must be non-empty and
/// contain a `:`. The resource and action parts are not checked further.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode(String);

impl PermissionCode {
    pub fn new(code: impl Into<String>) -> Result<Self, AuthError> {
        let code = code.into();
        if code.is_empty() || !code.contains(':') {
            return Err(AuthError::invalid_permission_code(&code));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text before the first `:`.
    pub fn resource(&self) -> &str {
        self.split().0
    }

    /// Text after the first `:`.
    pub fn action(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        // construction guarantees the separator
        self.0.split_once(':').unwrap_or((self.0.as_str(), ""))
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PermissionCode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = AuthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionCode> for String {
    fn from(code: PermissionCode) -> Self {
        code.0
    }
}

impl AsRef<str> for PermissionCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Well-known permission codes
pub mod codes {
    // Users
    pub const USERS_READ: &str = "users:read";
    pub const USERS_UPDATE: &str = "users:update";
    pub const USERS_DELETE: &str = "users:delete";

    // Snapshots
    pub const SNAPSHOTS_READ: &str = "snapshots:read";
    pub const SNAPSHOTS_DELETE: &str = "snapshots:delete";

    // Commands
    pub const COMMANDS_SEND: &str = "commands:send";
    pub const COMMANDS_ACKNOWLEDGE: &str = "commands:acknowledge";

    // Streaming and recordings
    pub const STREAMING_READ: &str = "streaming:read";
    pub const RECORDINGS_READ: &str = "recordings:read";

    // Audit
    pub const AUDIT_READ: &str = "audit:read";

    pub const ALL: [&str; 10] = [
        USERS_READ,
        USERS_UPDATE,
        USERS_DELETE,
        SNAPSHOTS_READ,
        SNAPSHOTS_DELETE,
        COMMANDS_SEND,
        COMMANDS_ACKNOWLEDGE,
        STREAMING_READ,
        RECORDINGS_READ,
        AUDIT_READ,
    ];
}
