//! Role whitelists, one per category of operation.
//!
//! Each list is authored on its own. They overlap freely and do not imply
//! any ordering between roles: ContactManager may read streaming status but
//! may not send commands.

use crate::models::user::Role;

pub const SEND_COMMANDS: &[Role] = &[Role::Admin, Role::Supervisor, Role::SuperAdmin];

pub const MANAGE_USERS: &[Role] = &[Role::Admin, Role::Supervisor, Role::SuperAdmin];

pub const PSO_ACCESS: &[Role] = &[Role::Pso];

pub const USER_QUERY: &[Role] = &[Role::Admin, Role::Supervisor, Role::SuperAdmin];

pub const COMMAND_ACKNOWLEDGMENT: &[Role] = &[Role::Pso];

pub const SUPER_ADMIN_ONLY: &[Role] = &[Role::SuperAdmin];

pub const CONTACT_MANAGER_ACCESS: &[Role] = &[Role::Pso, Role::ContactManager];

// PSO is excluded on purpose
pub const STREAMING_STATUS: &[Role] = &[Role::SuperAdmin, Role::Admin, Role::Supervisor, Role::ContactManager];

pub const ADMIN_OR_SUPER_ADMIN: &[Role] = &[Role::Admin, Role::SuperAdmin];
