//! Authorization rules for saved reports. Two independent restrictions exist:
//! a single permission key stored on the instance (enforced by the reporting
//! engine at view time) and a role set, enforced here before the edit form is
//! even built.

use anyhow::Result;
use rusqlite::Connection;

use crate::db;
use crate::session::Session;

/// Minimum permission to view saved reports; also the default offered by the
/// access selector for new instances.
pub const ACCESS_REPORTS: &str = "access reports";

/// Blanket permission that bypasses role restrictions on individual instances.
pub const ADMINISTER_REPORTS: &str = "administer reports";

/// Required to create or edit instances flagged as reserved.
pub const ADMINISTER_RESERVED_REPORTS: &str = "administer reserved reports";

/// Sentinel permission key meaning "no permission required". Stored verbatim
/// so an unrestricted instance is distinguishable from one that was never
/// configured.
pub const EVERYONE_PERMISSION: &str = "everyone";

/// Label the access selector shows for [`EVERYONE_PERMISSION`].
pub const EVERYONE_LABEL: &str = "Everyone (includes anonymous)";

/// Decide whether `session` may open the edit form for an instance. An
/// instance with no role restriction is open to everyone who got this far;
/// otherwise the user needs either a matching role or the blanket
/// administer-reports permission.
pub fn is_instance_grouprole_allowed(
    conn: &Connection,
    session: &Session,
    instance_id: i64,
) -> Result<bool> {
    let restriction = db::instances::instance_grouproles(conn, instance_id)?;
    if restriction.is_empty() {
        return Ok(true);
    }
    if session.has_permission(ADMINISTER_REPORTS) {
        return Ok(true);
    }
    Ok(restriction.iter().any(|role| session.has_role(role)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_in_memory;
    use crate::db::instances::{create_or_update, InstanceParams};
    use crate::config::AppConfig;

    fn saved_instance(conn: &Connection, grouprole: Vec<String>) -> i64 {
        let params = InstanceParams {
            grouprole,
            ..InstanceParams::sample("restricted/list", "Restricted listing")
        };
        create_or_update(conn, &AppConfig::default(), params)
            .expect("instance should save")
            .id
    }

    #[test]
    fn unrestricted_instance_is_open_to_anyone() {
        let conn = open_in_memory().unwrap();
        let id = saved_instance(&conn, Vec::new());
        assert!(is_instance_grouprole_allowed(&conn, &Session::anonymous(), id).unwrap());
    }

    #[test]
    fn matching_role_grants_access() {
        let conn = open_in_memory().unwrap();
        let id = saved_instance(&conn, vec!["editor".to_string()]);
        let editor = Session::for_user(7, vec!["editor".to_string()], Vec::new());
        let outsider = Session::for_user(8, vec!["authenticated".to_string()], Vec::new());
        assert!(is_instance_grouprole_allowed(&conn, &editor, id).unwrap());
        assert!(!is_instance_grouprole_allowed(&conn, &outsider, id).unwrap());
    }

    #[test]
    fn administer_reports_bypasses_role_restriction() {
        let conn = open_in_memory().unwrap();
        let id = saved_instance(&conn, vec!["editor".to_string()]);
        let admin = Session::for_user(1, Vec::new(), vec![ADMINISTER_REPORTS.to_string()]);
        assert!(is_instance_grouprole_allowed(&conn, &admin, id).unwrap());
    }
}
