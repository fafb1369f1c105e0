use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::user::User;
use crate::utils::time::current_timestamp_millis;

pub struct UserService<'a> {
    db: &'a Database,
}

impl<'a> UserService<'a> {
    pub fn new(db: &'a Database) -> Self {
        UserService { db }
    }

    pub async fn get_user_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, created_at
            FROM "user"
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(result)
    }

    #[allow(dead_code)]
    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, created_at
            FROM "user"
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(result)
    }

    /// Provisioning normally happens in the login collaborator; this is
    /// the collection's create operation for tooling and tests.
    #[allow(dead_code)]
    pub async fn create_user(&self, name: &str, email: &str) -> AppResult<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "user name must not be empty".to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = current_timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO "user" (id, name, email, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(now)
        .execute(&self.db.pool)
        .await?;

        self.get_user_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal("failed to create user".to_string()))
    }
}
