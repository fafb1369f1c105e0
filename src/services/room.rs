use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::room::Room;
use crate::utils::time::current_timestamp_millis;

pub struct RoomService<'a> {
    db: &'a Database,
}

impl<'a> RoomService<'a> {
    pub fn new(db: &'a Database) -> Self {
        RoomService { db }
    }

    pub async fn create_room(&self, name: &str, description: Option<&str>) -> AppResult<Room> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "room name must not be empty".to_string(),
            ));
        }
        let description = normalize_description(description);

        let id = uuid::Uuid::new_v4().to_string();
        let now = current_timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO room (id, name, description, created_at, last_active)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(&description)
        .bind(now)
        .bind(now)
        .execute(&self.db.pool)
        .await?;

        self.get_room_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal("failed to create room".to_string()))
    }

    pub async fn get_room_by_id(&self, id: &str) -> AppResult<Option<Room>> {
        let result = sqlx::query_as::<_, Room>(
            r#"
            SELECT id, name, description, created_at, last_active
            FROM room
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(result)
    }

    pub async fn get_all_rooms(&self) -> AppResult<Vec<Room>> {
        let rooms = sqlx::query_as::<_, Room>(
            r#"
            SELECT id, name, description, created_at, last_active
            FROM room
            ORDER BY last_active DESC
            "#,
        )
        .fetch_all(&self.db.pool)
        .await?;

        Ok(rooms)
    }

    pub async fn update_room(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Room> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "room name must not be empty".to_string(),
            ));
        }
        let description = normalize_description(description);

        self.get_room_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("room not found".to_string()))?;

        sqlx::query("UPDATE room SET name = $1, description = $2 WHERE id = $3")
            .bind(name)
            .bind(&description)
            .bind(id)
            .execute(&self.db.pool)
            .await?;

        self.get_room_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("room not found".to_string()))
    }

    /// Stamps the room's recency marker; called for every new message.
    pub async fn touch_last_active(&self, id: &str, at: i64) -> AppResult<()> {
        sqlx::query("UPDATE room SET last_active = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.db.pool)
            .await?;

        Ok(())
    }

    pub async fn delete_room(&self, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM room WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;

        Ok(())
    }
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}
