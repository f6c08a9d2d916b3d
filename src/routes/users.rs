use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::jwt::Caller;
use crate::models::user::User;

/// List active users. Restricted to the user-query whitelist.
pub async fn list_users(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Vec<User>>> {
    let requester = state.policy.authorize_user_query(&caller.caller_id).await?;
    tracing::info!(caller_id = %requester.caller_id, role = %requester.role, "listing users");

    let users = state.identities.list_active_users().await?;
    Ok(Json(users))
}
