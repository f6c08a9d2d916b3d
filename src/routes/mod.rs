pub mod authz;
pub mod health;
pub mod users;
