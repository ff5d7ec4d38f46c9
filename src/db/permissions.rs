use anyhow::{Context, Result};
use rusqlite::{params_from_iter, Connection};

use crate::models::{PermissionOption, RoleOption};

/// Permission groups the access selector draws from. Keys outside these
/// groups exist in the catalogue (billing, integrations) but make no sense as
/// report gates.
pub const REPORT_PERMISSION_GROUPS: &[&str] = &["reporting", "cms", "const"];

/// Active permissions from the given groups, sorted by label for display.
pub fn list_permissions(conn: &Connection, groups: &[&str]) -> Result<Vec<PermissionOption>> {
    if groups.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = (1..=groups.len())
        .map(|n| format!("?{n}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT key, label FROM permissions
         WHERE is_active = 1 AND grp IN ({placeholders})
         ORDER BY label COLLATE NOCASE"
    );

    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare permission query")?;

    let options = stmt
        .query_map(params_from_iter(groups.iter()), |row| {
            Ok(PermissionOption {
                key: row.get(0)?,
                label: row.get(1)?,
            })
        })
        .context("failed to iterate permissions")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect permissions")?;

    Ok(options)
}

/// Every site role, sorted by label. An empty result hides the role
/// multi-select entirely.
pub fn role_names(conn: &Connection) -> Result<Vec<RoleOption>> {
    let mut stmt = conn
        .prepare("SELECT name, label FROM roles ORDER BY label COLLATE NOCASE")
        .context("failed to prepare role query")?;

    let roles = stmt
        .query_map([], |row| {
            Ok(RoleOption {
                name: row.get(0)?,
                label: row.get(1)?,
            })
        })
        .context("failed to iterate roles")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect roles")?;

    Ok(roles)
}
