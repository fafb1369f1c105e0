use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::config::S3Config;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct File {
    pub id: String,
    pub room_id: String,
    pub filename: String,
    pub content_type: String,
    /// Stored in bytes; presentation converts to kilobytes.
    pub size: i64,
    pub uploaded: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileResponse {
    pub id: String,
    pub room: String,
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    /// Kilobytes, floored.
    pub size: i64,
    pub uploaded: i64,
    pub url: String,
}

impl FileResponse {
    /// Builds the outbound shape, including a download URL that points at
    /// the local upload collaborator or at the configured bucket.
    pub fn from_file(file: File, s3: Option<&S3Config>) -> Self {
        let path = format!("{}/{}", file.id, urlencoding::encode(&file.filename));
        let url = match s3 {
            Some(s3) => format!(
                "https://{}.s3-{}.amazonaws.com/{}",
                s3.bucket, s3.region, path
            ),
            None => format!("/files/{}", path),
        };

        FileResponse {
            id: file.id,
            room: file.room_id,
            name: file.filename,
            content_type: file.content_type,
            size: file.size / 1024,
            uploaded: file.uploaded,
            url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(size: i64) -> File {
        File {
            id: "f-1".to_string(),
            room_id: "r-1".to_string(),
            filename: "team photo.png".to_string(),
            content_type: "image/png".to_string(),
            size,
            uploaded: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_size_reported_in_kilobytes() {
        let response = FileResponse::from_file(sample(3 * 1024 + 512), None);
        assert_eq!(response.size, 3);
    }

    #[test]
    fn test_local_url_encodes_filename() {
        let response = FileResponse::from_file(sample(1024), None);
        assert_eq!(response.url, "/files/f-1/team%20photo.png");
    }

    #[test]
    fn test_s3_url_when_configured() {
        let s3 = S3Config {
            bucket: "parlor-files".to_string(),
            region: "eu-west-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
        };
        let response = FileResponse::from_file(sample(1024), Some(&s3));
        assert_eq!(
            response.url,
            "https://parlor-files.s3-eu-west-1.amazonaws.com/f-1/team%20photo.png"
        );
    }
}
