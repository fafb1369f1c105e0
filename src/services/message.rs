use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::message::{Message, MessageQuery};
use crate::utils::time::current_timestamp_millis;

pub struct MessageService<'a> {
    db: &'a Database,
}

impl<'a> MessageService<'a> {
    pub fn new(db: &'a Database) -> Self {
        MessageService { db }
    }

    pub async fn create_message(
        &self,
        room_id: &str,
        user_id: Option<&str>,
        content: &str,
    ) -> AppResult<Message> {
        if content.is_empty() {
            return Err(AppError::InvalidInput(
                "message text must not be empty".to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = current_timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO message (id, room_id, user_id, content, posted)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&id)
        .bind(room_id)
        .bind(user_id)
        .bind(content)
        .bind(now)
        .execute(&self.db.pool)
        .await?;

        self.get_message_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal("failed to create message".to_string()))
    }

    pub async fn get_message_by_id(&self, id: &str) -> AppResult<Option<Message>> {
        let result = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, room_id, user_id, content, posted
            FROM message
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(result)
    }

    /// Fetches newest-first, bounded by the filter. Callers reverse to
    /// chronological order before handing the batch to a client.
    pub async fn list_messages(&self, query: &MessageQuery, limit: i64) -> AppResult<Vec<Message>> {
        let mut clauses = Vec::new();
        let mut bind_count = 1;

        if query.room.is_some() {
            clauses.push(format!("room_id = ${}", bind_count));
            bind_count += 1;
        }
        if query.from.is_some() {
            clauses.push(format!("id > ${}", bind_count));
            bind_count += 1;
        }
        if query.since.is_some() {
            clauses.push(format!("posted >= ${}", bind_count));
            bind_count += 1;
        }

        let mut sql =
            String::from("SELECT id, room_id, user_id, content, posted FROM message");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY posted DESC LIMIT ${}", bind_count));

        let mut q = sqlx::query_as::<_, Message>(&sql);
        if let Some(room) = &query.room {
            q = q.bind(room);
        }
        if let Some(from) = &query.from {
            q = q.bind(from);
        }
        if let Some(since) = query.since {
            q = q.bind(since);
        }
        q = q.bind(limit);

        Ok(q.fetch_all(&self.db.pool).await?)
    }
}
