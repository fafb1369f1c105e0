use anyhow::Context;

/// Remote-storage coordinates. When set, file download URLs point at the
/// bucket instead of the local upload collaborator.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub uploads_dir: String,
    /// MIME types the upload collaborator accepts.
    pub allowed_file_types: Vec<String>,
    pub s3: Option<S3Config>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("CHAT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("CHAT_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .context("CHAT_PORT must be a port number")?;
        let database_url = std::env::var("CHAT_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://parlor.db".to_string());
        let jwt_secret =
            std::env::var("CHAT_JWT_SECRET").context("CHAT_JWT_SECRET must be set")?;
        let uploads_dir =
            std::env::var("CHAT_UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string());

        let allowed_file_types = std::env::var("CHAT_ALLOWED_FILE_TYPES")
            .unwrap_or_else(|_| "image/jpeg,image/png,image/gif".to_string())
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let s3 = match std::env::var("CHAT_S3_BUCKET") {
            Ok(bucket) => Some(S3Config {
                bucket,
                region: std::env::var("CHAT_S3_REGION")
                    .context("CHAT_S3_REGION must be set when CHAT_S3_BUCKET is")?,
                access_key_id: std::env::var("CHAT_S3_ACCESS_KEY_ID").unwrap_or_default(),
                secret_access_key: std::env::var("CHAT_S3_SECRET_ACCESS_KEY").unwrap_or_default(),
            }),
            Err(_) => None,
        };

        Ok(Config {
            host,
            port,
            database_url,
            jwt_secret,
            uploads_dir,
            allowed_file_types,
            s3,
        })
    }
}
