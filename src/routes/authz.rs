use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::authz::PermissionCode;
use crate::errors::AppResult;
use crate::jwt::Caller;

/// Advisory answers for the current caller, used to gate UI.
#[derive(Debug, Serialize, Deserialize)]
pub struct CapabilitiesResponse {
    pub caller_id: String,
    pub active: bool,
    pub can_send_commands: bool,
    pub can_manage_users: bool,
    pub can_access_pso: bool,
    pub can_access_admin: bool,
    pub is_admin_or_super_admin: bool,
    pub is_super_admin: bool,
}

pub async fn me(State(state): State<AppState>, caller: Caller) -> AppResult<Json<CapabilitiesResponse>> {
    let policy = &state.policy;
    let id = caller.caller_id.as_str();

    let (active, can_send_commands, can_manage_users, can_access_pso, can_access_admin, is_admin_or_super_admin, is_super_admin) =
        tokio::try_join!(
            policy.is_user_active(id),
            policy.can_send_commands(id),
            policy.can_manage_users(id),
            policy.can_access_pso(id),
            policy.can_access_admin(id),
            policy.is_admin_or_super_admin(id),
            policy.is_super_admin(id),
        )?;

    Ok(Json(CapabilitiesResponse {
        caller_id: caller.caller_id,
        active,
        can_send_commands,
        can_manage_users,
        can_access_pso,
        can_access_admin,
        is_admin_or_super_admin,
        is_super_admin,
    }))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    #[default]
    Any,
    All,
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub permissions: Vec<String>,
    #[serde(default)]
    pub mode: CheckMode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub allowed: bool,
}

pub async fn check(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<CheckRequest>,
) -> AppResult<Json<CheckResponse>> {
    let permissions = req
        .permissions
        .into_iter()
        .map(PermissionCode::new)
        .collect::<Result<Vec<_>, _>>()?;

    let allowed = match req.mode {
        CheckMode::Any => state.policy.has_any_permission(&caller.caller_id, &permissions).await?,
        CheckMode::All => state.policy.has_all_permissions(&caller.caller_id, &permissions).await?,
    };

    Ok(Json(CheckResponse { allowed }))
}
