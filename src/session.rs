//! The acting user. The form layer never consults ambient global state to find
//! out who is saving a report; callers construct a [`Session`] up front and
//! pass it through, which keeps authorization decisions testable.

#[derive(Debug, Clone)]
pub struct Session {
    /// Contact id of the logged-in user, `None` for anonymous access.
    pub user_id: Option<i64>,
    /// Site roles held by the user, as role names.
    pub roles: Vec<String>,
    /// Permission keys granted to the user.
    pub permissions: Vec<String>,
}

impl Session {
    /// A session with no user, no roles and no permissions.
    pub fn anonymous() -> Self {
        Session {
            user_id: None,
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn for_user(user_id: i64, roles: Vec<String>, permissions: Vec<String>) -> Self {
        Session {
            user_id: Some(user_id),
            roles,
            permissions,
        }
    }

    /// Full-access session used by the local console, where the operator is by
    /// definition the site administrator.
    pub fn administrator(user_id: i64) -> Self {
        Session::for_user(
            user_id,
            vec!["administrator".to_string()],
            vec![
                crate::access::ACCESS_REPORTS.to_string(),
                crate::access::ADMINISTER_REPORTS.to_string(),
                crate::access::ADMINISTER_RESERVED_REPORTS.to_string(),
            ],
        )
    }

    pub fn has_permission(&self, key: &str) -> bool {
        self.permissions.iter().any(|held| held == key)
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|held| held == name)
    }
}
