use std::path::PathBuf;

use crate::{constants::Env, modules::message::schema::AttachmentKind};

/// Attachment storage configuration
#[derive(Debug, Clone)]
pub struct AttachmentConfig {
    pub max_size: usize,
    pub upload_dir: PathBuf,
    /// URL prefix the upload directory is served under.
    pub public_prefix: String,
}

impl AttachmentConfig {
    pub fn from_env(env: &Env) -> Self {
        Self {
            max_size: env.max_attachment_size,
            upload_dir: env.upload_dir(),
            public_prefix: env.upload_url_prefix.clone(),
        }
    }
}

/// An accepted upload type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub kind: AttachmentKind,
    pub mime: String,
    pub extension: &'static str,
}

/// A file that has been moved into the public upload directory.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub stored_name: String,
    pub size: usize,
}
