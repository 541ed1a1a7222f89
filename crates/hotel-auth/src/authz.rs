//! Role-based permissions
//!
//! Every screen and action asks the same evaluator instead of carrying its
//! own role checks. Lookups are pure and cheap; unknown roles fail closed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::RoleConfig;
use crate::SUPERUSER_PERMISSION;

/// A staff role
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Role {
    /// Role id referenced by credential records
    pub role_id: i64,
    /// Display name
    pub name: String,
    /// Granted permissions
    pub permissions: HashSet<String>,
}

impl Role {
    /// Whether this role holds the superuser permission
    pub fn is_superuser(&self) -> bool {
        self.permissions.contains(SUPERUSER_PERMISSION)
    }
}

/// Dashboard sections gated by permissions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    Rooms,
    Guests,
    Bookings,
    Cleaning,
    Users,
}

impl Feature {
    /// All features in dashboard order
    pub const ALL: [Feature; 5] = [
        Feature::Rooms,
        Feature::Guests,
        Feature::Bookings,
        Feature::Cleaning,
        Feature::Users,
    ];

    /// Permission a role needs to see this feature
    ///
    /// Staff management is reserved for superusers.
    pub fn required_permission(&self) -> &'static str {
        match self {
            Feature::Rooms => "manage_rooms",
            Feature::Guests => "manage_guests",
            Feature::Bookings => "manage_bookings",
            Feature::Cleaning => "manage_cleaning",
            Feature::Users => SUPERUSER_PERMISSION,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            Feature::Rooms => "Rooms",
            Feature::Guests => "Guests",
            Feature::Bookings => "Bookings",
            Feature::Cleaning => "Cleaning",
            Feature::Users => "Users",
        };
        f.write_str(title)
    }
}

/// Answers permission checks for roles loaded at startup
#[derive(Clone, Debug, Default)]
pub struct AuthorizationEvaluator {
    roles: HashMap<i64, Role>,
}

impl AuthorizationEvaluator {
    /// Build the evaluator from configured roles
    pub fn new(roles: &BTreeMap<i64, RoleConfig>) -> Self {
        let roles = roles
            .iter()
            .map(|(&role_id, config)| {
                let role = Role {
                    role_id,
                    name: config.name.clone(),
                    permissions: config.permissions.iter().cloned().collect(),
                };
                (role_id, role)
            })
            .collect();
        Self { roles }
    }

    /// Whether `role_id` may use `permission`
    ///
    /// Superuser roles may do anything; unknown roles may do nothing.
    pub fn can(&self, role_id: i64, permission: &str) -> bool {
        let allowed = match self.roles.get(&role_id) {
            Some(role) => role.is_superuser() || role.permissions.contains(permission),
            None => false,
        };
        trace!(role_id, permission, allowed, "permission check");
        allowed
    }

    /// Whether `role_id` is a superuser role
    pub fn is_superuser(&self, role_id: i64) -> bool {
        self.roles.get(&role_id).is_some_and(Role::is_superuser)
    }

    /// Whether `role_id` may open `feature`
    pub fn can_access(&self, role_id: i64, feature: Feature) -> bool {
        self.can(role_id, feature.required_permission())
    }

    /// Features visible to `role_id`, in dashboard order
    pub fn visible_features(&self, role_id: i64) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|&f| self.can_access(role_id, f))
            .collect()
    }

    /// Look up a role
    pub fn role(&self, role_id: i64) -> Option<&Role> {
        self.roles.get(&role_id)
    }

    /// Display name of a role
    pub fn role_name(&self, role_id: i64) -> Option<&str> {
        self.roles.get(&role_id).map(|r| r.name.as_str())
    }

    /// All roles ordered by id
    pub fn roles(&self) -> Vec<&Role> {
        let mut roles: Vec<_> = self.roles.values().collect();
        roles.sort_by_key(|r| r.role_id);
        roles
    }

    /// Lowest-numbered superuser role, if any
    pub fn superuser_role(&self) -> Option<i64> {
        self.roles().into_iter().find(|r| r.is_superuser()).map(|r| r.role_id)
    }
}
