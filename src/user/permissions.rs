use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    AccessSongbook,
    ContributeContent,
    FavoriteContent,
    OwnSetlists,
    ModerateContent,
    ManageUsers,
}

impl Permission {
    pub fn as_int(self) -> i32 {
        match self {
            Permission::AccessSongbook => 1,
            Permission::ContributeContent => 2,
            Permission::FavoriteContent => 3,
            Permission::OwnSetlists => 4,
            Permission::ModerateContent => 5,
            Permission::ManageUsers => 6,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            1 => Some(Permission::AccessSongbook),
            2 => Some(Permission::ContributeContent),
            3 => Some(Permission::FavoriteContent),
            4 => Some(Permission::OwnSetlists),
            5 => Some(Permission::ModerateContent),
            6 => Some(Permission::ManageUsers),
            _ => None,
        }
    }
}

const REGULAR_PERMISSIONS: &[Permission] = &[
    Permission::AccessSongbook,
    Permission::ContributeContent,
    Permission::FavoriteContent,
    Permission::OwnSetlists,
];
const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::AccessSongbook,
    Permission::ContributeContent,
    Permission::FavoriteContent,
    Permission::OwnSetlists,
    Permission::ModerateContent,
    Permission::ManageUsers,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    Regular,
}

impl UserRole {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::Admin => ADMIN_PERMISSIONS,
            UserRole::Regular => REGULAR_PERMISSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Regular => "Regular",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "regular" => Some(UserRole::Regular),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_int_roundtrip() {
        for permission in ADMIN_PERMISSIONS {
            assert_eq!(Permission::from_int(permission.as_int()), Some(*permission));
        }
        assert_eq!(Permission::from_int(0), None);
        assert_eq!(Permission::from_int(7), None);
        assert_eq!(Permission::from_int(-1), None);
    }

    #[test]
    fn regular_cannot_moderate() {
        let regular = UserRole::Regular.permissions();
        assert_eq!(regular.len(), 4);
        assert!(regular.contains(&Permission::ContributeContent));
        assert!(regular.contains(&Permission::OwnSetlists));
        assert!(!regular.contains(&Permission::ModerateContent));
        assert!(!regular.contains(&Permission::ManageUsers));
    }

    #[test]
    fn admin_has_every_regular_permission() {
        let admin = UserRole::Admin.permissions();
        for permission in UserRole::Regular.permissions() {
            assert!(admin.contains(permission));
        }
        assert!(admin.contains(&Permission::ModerateContent));
        assert!(admin.contains(&Permission::ManageUsers));
    }

    #[test]
    fn user_role_from_str_is_case_insensitive() {
        assert_eq!(UserRole::from_str("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_str("ADMIN"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_str("Regular"), Some(UserRole::Regular));
        assert_eq!(UserRole::from_str("moderator"), None);
        assert_eq!(UserRole::from_str(""), None);
    }

    #[test]
    fn user_role_roundtrip() {
        for role in [UserRole::Admin, UserRole::Regular] {
            assert_eq!(UserRole::from_str(role.as_str()), Some(role));
        }
    }
}
