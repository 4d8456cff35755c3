use std::path::PathBuf;

/// Longest accepted message body, in characters, after trimming.
pub const MAX_MESSAGE_LENGTH: usize = 2000;
pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Seconds a user profile stays in the Redis cache.
pub const USER_CACHE_TTL: usize = 3600;
/// Text served in place of a deleted message in conversation previews.
pub const TOMBSTONE_TEXT: &str = "This message was deleted";

pub struct Env {
    pub jwt_secret: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
    pub storage_path: PathBuf,
    pub upload_url_prefix: String,
    pub max_attachment_size: usize,
}

impl Env {
    fn new() -> Self {
        let jwt_secret = std::env::var("SECRET_KEY")
            .expect("SECRET_KEY must be set in .env file or environment variable");

        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in .env file or environment variable");
        let database_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .expect("DATABASE_MAX_CONNECTIONS must be a valid u32 integer");
        let redis_url = std::env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty());

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let ip = std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16 integer");

        let storage_path =
            PathBuf::from(std::env::var("STORAGE_PATH").unwrap_or_else(|_| "./data".to_string()));
        let upload_url_prefix =
            std::env::var("UPLOAD_URL_PREFIX").unwrap_or_else(|_| "/uploads".to_string());
        let max_attachment_size = std::env::var("MAX_ATTACHMENT_SIZE")
            .unwrap_or_else(|_| (50 * 1024 * 1024).to_string())
            .parse::<usize>()
            .expect("MAX_ATTACHMENT_SIZE must be a valid byte count");

        Env {
            jwt_secret,
            database_url,
            database_max_connections,
            redis_url,
            frontend_url,
            ip,
            port,
            storage_path,
            upload_url_prefix,
            max_attachment_size,
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.storage_path.join("uploads")
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
