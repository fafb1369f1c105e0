use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::file::File;
use crate::utils::time::current_timestamp_millis;

pub struct FileService<'a> {
    db: &'a Database,
}

impl<'a> FileService<'a> {
    pub fn new(db: &'a Database) -> Self {
        FileService { db }
    }

    /// Persists an upload record. Called by the upload collaborator after
    /// the bytes have been stored; `size` is in bytes.
    #[allow(dead_code)]
    pub async fn create_file(
        &self,
        room_id: &str,
        name: &str,
        content_type: &str,
        size: i64,
    ) -> AppResult<File> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "file name must not be empty".to_string(),
            ));
        }
        if size < 0 {
            return Err(AppError::InvalidInput(
                "file size must not be negative".to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = current_timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO file (id, room_id, filename, content_type, size, uploaded)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&id)
        .bind(room_id)
        .bind(name)
        .bind(content_type)
        .bind(size)
        .bind(now)
        .execute(&self.db.pool)
        .await?;

        self.get_file_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal("failed to create file".to_string()))
    }

    pub async fn get_file_by_id(&self, id: &str) -> AppResult<Option<File>> {
        let result = sqlx::query_as::<_, File>(
            r#"
            SELECT id, room_id, filename, content_type, size, uploaded
            FROM file
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(result)
    }

    pub async fn get_files_by_room_id(&self, room_id: &str) -> AppResult<Vec<File>> {
        let files = sqlx::query_as::<_, File>(
            r#"
            SELECT id, room_id, filename, content_type, size, uploaded
            FROM file
            WHERE room_id = $1
            ORDER BY uploaded ASC
            "#,
        )
        .bind(room_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(files)
    }
}
