use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

/// Role hierarchy is strictly linear: `Owner ⊃ Admin ⊃ Editor ⊃ Viewer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ProjectRole {
    Owner,
    Admin,
    Editor,
    Viewer,
}

impl ProjectRole {
    /// Lower rank means more privilege; used for `require_role` comparisons.
    pub fn rank(&self) -> u8 {
        match self {
            ProjectRole::Owner => 0,
            ProjectRole::Admin => 1,
            ProjectRole::Editor => 2,
            ProjectRole::Viewer => 3,
        }
    }

    pub fn can_read(&self) -> bool {
        true
    }

    pub fn can_write(&self) -> bool {
        matches!(self, ProjectRole::Owner | ProjectRole::Admin | ProjectRole::Editor)
    }

    pub fn can_manage_members(&self) -> bool {
        matches!(self, ProjectRole::Owner | ProjectRole::Admin)
    }

    pub fn can_delete(&self) -> bool {
        matches!(self, ProjectRole::Owner)
    }

    /// `self` satisfies a requirement of `required` iff `self` outranks or
    /// equals it numerically (lower rank number = more privilege).
    pub fn satisfies(&self, required: ProjectRole) -> bool {
        self.rank() <= required.rank()
    }
}

impl std::fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectRole::Owner => write!(f, "owner"),
            ProjectRole::Admin => write!(f, "admin"),
            ProjectRole::Editor => write!(f, "editor"),
            ProjectRole::Viewer => write!(f, "viewer"),
        }
    }
}

impl std::str::FromStr for ProjectRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(ProjectRole::Owner),
            "admin" => Ok(ProjectRole::Admin),
            "editor" => Ok(ProjectRole::Editor),
            "viewer" => Ok(ProjectRole::Viewer),
            _ => Err(format!("invalid project role: {s}")),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProjectMember {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub project_id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub role: ProjectRole,
    pub granted_at: DateTime<Utc>,
}

impl TryFrom<String> for ProjectRole {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_hierarchy_is_linear() {
        assert!(ProjectRole::Owner.satisfies(ProjectRole::Viewer));
        assert!(ProjectRole::Owner.satisfies(ProjectRole::Owner));
        assert!(!ProjectRole::Viewer.satisfies(ProjectRole::Editor));
        assert!(ProjectRole::Editor.satisfies(ProjectRole::Editor));
    }

    #[test]
    fn capability_methods_match_spec_hierarchy() {
        assert!(ProjectRole::Owner.can_delete());
        assert!(!ProjectRole::Admin.can_delete());
        assert!(ProjectRole::Admin.can_manage_members());
        assert!(!ProjectRole::Editor.can_manage_members());
        assert!(ProjectRole::Editor.can_write());
        assert!(!ProjectRole::Viewer.can_write());
        assert!(ProjectRole::Viewer.can_read());
    }

    #[test]
    fn role_from_str_roundtrips_display() {
        for role in [ProjectRole::Owner, ProjectRole::Admin, ProjectRole::Editor, ProjectRole::Viewer] {
            let s = role.to_string();
            assert_eq!(s.parse::<ProjectRole>().unwrap(), role);
        }
    }
}
