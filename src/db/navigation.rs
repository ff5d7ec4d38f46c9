use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::NavigationEntry;

/// Meta-table key under which the assembled menu is cached.
const NAV_CACHE_KEY: &str = "navigation_cache";

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One line of the flattened menu tree: the entry plus how deep it sits, so
/// renderers can indent without re-walking parents.
pub struct MenuRow {
    pub depth: usize,
    pub entry: NavigationEntry,
}

/// The navigation menu in display order, depth-first with siblings sorted by
/// weight then label. Served from the cache when warm; rebuilt and re-cached
/// otherwise. Inactive entries, and anything beneath them, are excluded.
pub fn navigation_list(conn: &Connection) -> Result<Vec<MenuRow>> {
    if let Some(raw) = read_cache(conn)? {
        match serde_json::from_str::<Vec<MenuRow>>(&raw) {
            Ok(rows) => return Ok(rows),
            Err(err) => warn!(error = %err, "discarding unreadable navigation cache"),
        }
    }

    let rows = assemble_menu(conn)?;
    let encoded =
        serde_json::to_string(&rows).context("failed to encode navigation cache")?;
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![NAV_CACHE_KEY, encoded],
    )
    .context("failed to store navigation cache")?;
    debug!(entries = rows.len(), "rebuilt navigation cache");
    Ok(rows)
}

/// Drop the cached menu so the next read reassembles it from the table.
pub fn reset_navigation_cache(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM meta WHERE key = ?1", params![NAV_CACHE_KEY])
        .context("failed to reset navigation cache")?;
    Ok(())
}

/// Whether a cached copy of the menu currently exists. Lets callers verify
/// that edits invalidated the cache without rebuilding it as a side effect.
pub fn navigation_cache_is_warm(conn: &Connection) -> Result<bool> {
    Ok(read_cache(conn)?.is_some())
}

fn read_cache(conn: &Connection) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM meta WHERE key = ?1",
        params![NAV_CACHE_KEY],
        |row| row.get(0),
    )
    .optional()
    .context("failed to read navigation cache")
}

fn assemble_menu(conn: &Connection) -> Result<Vec<MenuRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, label, parent_id, url, permission, is_active, weight
             FROM navigation
             WHERE is_active = 1
             ORDER BY weight, label COLLATE NOCASE",
        )
        .context("failed to prepare navigation query")?;

    let entries = stmt
        .query_map([], hydrate_entry)
        .context("failed to iterate navigation entries")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect navigation entries")?;

    let mut children: HashMap<Option<i64>, Vec<NavigationEntry>> = HashMap::new();
    for entry in entries {
        children.entry(entry.parent_id).or_default().push(entry);
    }

    let mut rows = Vec::new();
    push_subtree(&children, None, 0, &mut rows);
    Ok(rows)
}

fn push_subtree(
    children: &HashMap<Option<i64>, Vec<NavigationEntry>>,
    parent: Option<i64>,
    depth: usize,
    out: &mut Vec<MenuRow>,
) {
    let Some(siblings) = children.get(&parent) else {
        return;
    };
    for entry in siblings {
        out.push(MenuRow {
            depth,
            entry: entry.clone(),
        });
        push_subtree(children, Some(entry.id), depth + 1, out);
    }
}

/// Load one menu entry by id.
pub fn get_entry(conn: &Connection, id: i64) -> Result<Option<NavigationEntry>> {
    conn.query_row(
        "SELECT id, label, parent_id, url, permission, is_active, weight
         FROM navigation WHERE id = ?1",
        params![id],
        hydrate_entry,
    )
    .optional()
    .context("failed to load navigation entry")
}

/// Remove a menu entry. Children cascade away with it, and we surface an
/// explicit error when zero rows are touched.
pub fn delete_entry(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM navigation WHERE id = ?1", params![id])
        .context("failed to delete navigation entry")?;

    if deleted == 0 {
        Err(anyhow!("Menu entry not found"))
    } else {
        Ok(())
    }
}

/// Create or refresh the menu entry that points at a saved report. A stashed
/// entry id that no longer exists falls through to an insert, so a menu pruned
/// behind our back cannot wedge the save.
pub fn upsert_report_entry(
    conn: &Connection,
    existing_id: Option<i64>,
    parent_id: Option<i64>,
    label: &str,
    url: &str,
    permission: Option<&str>,
) -> Result<i64> {
    if let Some(id) = existing_id {
        let updated = conn
            .execute(
                "UPDATE navigation
                 SET label = ?1, parent_id = ?2, url = ?3, permission = ?4, is_active = 1
                 WHERE id = ?5",
                params![label, parent_id, url, permission, id],
            )
            .context("failed to update navigation entry")?;
        if updated > 0 {
            return Ok(id);
        }
        debug!(entry = id, "stashed menu entry vanished, inserting a fresh one");
    }

    conn.execute(
        "INSERT INTO navigation (label, parent_id, url, permission, is_active, weight)
         VALUES (?1, ?2, ?3, ?4, 1, 0)",
        params![label, parent_id, url, permission],
    )
    .context("failed to insert navigation entry")?;
    Ok(conn.last_insert_rowid())
}

/// Candidate parents for the "Parent Menu" selector: every active entry,
/// labelled with indentation that mirrors its depth in the tree.
pub fn parent_options(conn: &Connection) -> Result<Vec<(i64, String)>> {
    let rows = navigation_list(conn)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let label = format!("{}{}", "  ".repeat(row.depth), row.entry.label);
            (row.entry.id, label)
        })
        .collect())
}

fn hydrate_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<NavigationEntry> {
    Ok(NavigationEntry {
        id: row.get(0)?,
        label: row.get(1)?,
        parent_id: row.get(2)?,
        url: row.get(3)?,
        permission: row.get(4)?,
        is_active: row.get(5)?,
        weight: row.get(6)?,
    })
}
