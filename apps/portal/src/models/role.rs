use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    /// Account roles. Institutions authenticate separately but the role row
    /// exists so permissions can be attached to it.
    pub enum RoleName {
        Admin => "admin",
        Institution => "institution",
        JobSeeker => "job_seeker",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RoleRow {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PermissionRow {
    pub id: Uuid,
    pub codename: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleWithPermissions {
    pub role: RoleRow,
    pub permissions: Vec<PermissionRow>,
}
