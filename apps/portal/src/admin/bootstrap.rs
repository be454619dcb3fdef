use sqlx::PgPool;
use tracing::info;

use crate::accounts::password::hash_password;
use crate::accounts::store::{find_user_by_email, insert_user, NewUser};
use crate::config::AdminBootstrap;
use crate::errors::AppError;
use crate::models::role::RoleName;

/// Username derived from the admin email's local part.
pub fn admin_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default().trim();
    if local.is_empty() {
        "admin".to_string()
    } else {
        local.to_string()
    }
}

/// Makes sure a verified admin account exists for the configured email.
/// An existing account with that email is promoted rather than duplicated.
pub async fn ensure_admin(pool: &PgPool, admin: &AdminBootstrap) -> Result<(), AppError> {
    if let Some(user) = find_user_by_email(pool, &admin.email).await? {
        if user.role != RoleName::Admin.as_str() || !user.verified {
            sqlx::query(
                "UPDATE users SET role_id = (SELECT id FROM roles WHERE name = $1), verified = TRUE WHERE id = $2",
            )
            .bind(RoleName::Admin.as_str())
            .bind(user.id)
            .execute(pool)
            .await?;
            info!("Promoted {} to admin", user.id);
        }
        return Ok(());
    }

    let password_hash = hash_password(&admin.password)?;
    let username = admin_username(&admin.email);
    let id = insert_user(
        pool,
        NewUser {
            username: &username,
            email: admin.email.trim(),
            phone: None,
            password_hash: &password_hash,
            role: RoleName::Admin,
            verified: true,
        },
    )
    .await?;
    info!("Created admin account {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_username() {
        assert_eq!(admin_username("ops@omeiat.example"), "ops");
        assert_eq!(admin_username("@nowhere"), "admin");
    }
}
