use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::role::{PermissionRow, RoleName, RoleRow, RoleWithPermissions};
use crate::models::user::{UserRow, USER_COLUMNS};
use crate::models::zone::Zone;
use crate::pagination::{Page, PageWindow};

/// Query string of the admin user list.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub verified: Option<bool>,
    pub username: Option<String>,
    pub page: Option<String>,
}

impl UserListQuery {
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) -> Result<(), AppError> {
        qb.push(" WHERE TRUE");
        if let Some(role) = self.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            let role: RoleName = role.parse()?;
            qb.push(" AND r.name = ").push_bind(role.as_str());
        }
        if let Some(verified) = self.verified {
            qb.push(" AND u.verified = ").push_bind(verified);
        }
        if let Some(name) = self.username.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            qb.push(" AND u.username ILIKE ").push_bind(format!("%{name}%"));
        }
        Ok(())
    }
}

pub async fn list_users(pool: &PgPool, query: &UserListQuery, per_page: i64) -> Result<Page<UserRow>, AppError> {
    let mut count_qb: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM users u JOIN roles r ON r.id = u.role_id");
    query.push_where(&mut count_qb)?;
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let window = PageWindow::resolve(query.page.as_deref(), per_page, total);
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id"));
    query.push_where(&mut qb)?;
    qb.push(" ORDER BY u.username LIMIT ")
        .push_bind(window.limit())
        .push(" OFFSET ")
        .push_bind(window.offset());
    let items = qb.build_query_as::<UserRow>().fetch_all(pool).await?;
    Ok(Page::new(items, window, total))
}

pub async fn roles_with_permissions(pool: &PgPool) -> Result<Vec<RoleWithPermissions>, AppError> {
    let roles: Vec<RoleRow> = sqlx::query_as("SELECT id, name FROM roles ORDER BY name")
        .fetch_all(pool)
        .await?;
    let grants: Vec<(Uuid, Uuid, String, String)> = sqlx::query_as(
        r#"
        SELECT rp.role_id, p.id, p.codename, p.name
        FROM role_permissions rp
        JOIN permissions p ON p.id = rp.permission_id
        ORDER BY p.codename
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(roles
        .into_iter()
        .map(|role| {
            let permissions = grants
                .iter()
                .filter(|(role_id, ..)| *role_id == role.id)
                .map(|(_, id, codename, name)| PermissionRow {
                    id: *id,
                    codename: codename.clone(),
                    name: name.clone(),
                })
                .collect();
            RoleWithPermissions { role, permissions }
        })
        .collect())
}

pub async fn create_zone(pool: &PgPool, name: &str) -> Result<Zone, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Zone name is required.".to_string()));
    }
    Ok(sqlx::query_as("INSERT INTO zones (name) VALUES ($1) RETURNING id, name")
        .bind(name)
        .fetch_one(pool)
        .await?)
}

pub async fn delete_zone(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM zones WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Zone {id} not found")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for(query: &UserListQuery) -> Result<String, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM users u JOIN roles r ON r.id = u.role_id");
        query.push_where(&mut qb)?;
        Ok(qb.sql().to_string())
    }

    #[test]
    fn test_user_filters() {
        let query = UserListQuery {
            role: Some("job_seeker".into()),
            verified: Some(true),
            username: Some("ra".into()),
            page: None,
        };
        let sql = sql_for(&query).unwrap();
        assert!(sql.ends_with(" WHERE TRUE AND r.name = $1 AND u.verified = $2 AND u.username ILIKE $3"));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let query = UserListQuery {
            role: Some("superuser".into()),
            ..Default::default()
        };
        assert!(sql_for(&query).is_err());
    }

    #[test]
    fn test_no_filters() {
        assert!(sql_for(&UserListQuery::default()).unwrap().ends_with(" WHERE TRUE"));
    }
}
