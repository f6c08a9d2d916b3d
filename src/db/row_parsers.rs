use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::authz::{PermissionCode, StoreError};
use crate::models::user::{Role, User};

fn invalid(message: String) -> StoreError {
    StoreError::InvalidRecord(message)
}

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    let s = s.trim();

    // RFC3339 (e.g. 2025-11-19T12:34:56Z)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // SQLite CURRENT_TIMESTAMP: "YYYY-MM-DD HH:MM:SS" (with optional fractional seconds)
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(naive_date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = naive_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| invalid("invalid datetime: date out of range".to_string()))?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(invalid(format!("invalid datetime: {}", s)))
}

fn parse_opt_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s.as_deref().map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Ok(Some(parse_datetime(trimmed)?)),
        _ => Ok(None),
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|e| invalid(format!("invalid uuid: {}", e)))
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| invalid(format!("missing {}: {}", name, e)))
}

pub fn user_from_row(row: &SqliteRow) -> Result<User, StoreError> {
    let id_s: String = column(row, "id")?;
    let caller_id: String = column(row, "caller_id")?;
    let email: String = column(row, "email")?;
    let name: String = column(row, "name")?;
    let role_s: String = column(row, "role")?;
    let supervisor_id_s: Option<String> = column(row, "supervisor_id")?;
    let created_at_s: String = column(row, "created_at")?;
    let updated_at_s: String = column(row, "updated_at")?;
    let deleted_at_s: Option<String> = column(row, "deleted_at")?;

    let role = role_s.parse::<Role>().map_err(|e| invalid(format!("{}", e)))?;
    let supervisor_id = supervisor_id_s.as_deref().map(parse_uuid).transpose()?;

    Ok(User {
        id: parse_uuid(&id_s)?,
        caller_id,
        email,
        name,
        role,
        supervisor_id,
        created_at: parse_datetime(&created_at_s)?,
        updated_at: parse_datetime(&updated_at_s)?,
        deleted_at: parse_opt_datetime(deleted_at_s)?,
    })
}

pub fn permission_code_from_row(row: &SqliteRow) -> Result<PermissionCode, StoreError> {
    let code: String = column(row, "code")?;
    PermissionCode::new(code).map_err(|e| invalid(e.to_string()))
}
