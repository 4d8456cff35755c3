use log::warn;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        attachment::model::{AttachmentConfig, MediaType, StoredFile},
        conversation::service::ConversationService,
        message::{
            model::{Attachment, MessageResponse},
            schema::AttachmentKind,
            service::{MessageService, normalize_content},
        },
    },
};

const STAGING_DIR: &str = ".staging";
const FALLBACK_NAME: &str = "attachment";

/// Lower-cases the MIME type and strips parameters. When the client sent
/// nothing useful, the type is guessed from the file name.
pub fn normalize_mime(content_type: Option<&str>, original_name: &str) -> String {
    let declared = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    match declared {
        Some(mime) => mime,
        None => mime_guess::from_path(original_name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string(),
    }
}

fn extension_for(mime: &str) -> Option<&'static str> {
    let ext = match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/webm" | "audio/webm" => "webm",
        "video/quicktime" => "mov",
        "audio/mpeg" => "mp3",
        "audio/wav" => "wav",
        "audio/ogg" => "ogg",
        "audio/mp4" => "m4a",
        _ => return None,
    };
    Some(ext)
}

pub fn classify(
    content_type: Option<&str>,
    original_name: &str,
) -> Result<MediaType, error::SystemError> {
    let mime = normalize_mime(content_type, original_name);

    match (AttachmentKind::from_mime(&mime), extension_for(&mime)) {
        (Some(kind), Some(extension)) => Ok(MediaType { kind, mime, extension }),
        _ => Err(error::SystemError::unsupported_media_type(format!(
            "File type '{}' is not allowed. Only images, videos and audio files are accepted",
            mime
        ))),
    }
}

/// Final path component of a client-supplied file name.
pub fn display_name(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

/// Local-disk attachment storage. Files are written under a hidden staging
/// directory and only renamed into the public directory on commit.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    config: AttachmentConfig,
}

impl AttachmentStore {
    pub fn new(config: AttachmentConfig) -> Self {
        Self { config }
    }

    pub async fn stage(&self, media: &MediaType) -> Result<StagedAttachment, error::SystemError> {
        let staging_dir = self.config.upload_dir.join(STAGING_DIR);
        tokio::fs::create_dir_all(&staging_dir).await?;

        let stored_name = format!("{}.{}", Uuid::now_v7(), media.extension);
        let temp_path = staging_dir.join(format!("{}.part", stored_name));
        let file = tokio::fs::File::create(&temp_path).await?;

        Ok(StagedAttachment {
            file: Some(file),
            final_path: self.config.upload_dir.join(&stored_name),
            temp_path,
            stored_name,
            written: 0,
            limit: self.config.max_size,
            finished: false,
        })
    }

    pub fn public_url(&self, stored_name: &str) -> String {
        format!("{}/{}", self.config.public_prefix.trim_end_matches('/'), stored_name)
    }

    pub fn path_of(&self, stored_name: &str) -> PathBuf {
        self.config.upload_dir.join(stored_name)
    }

    /// Best effort: failures are logged.
    pub async fn remove(&self, stored_name: &str) {
        if let Err(e) = tokio::fs::remove_file(self.path_of(stored_name)).await {
            warn!("Failed to remove attachment {}: {}", stored_name, e);
        }
    }
}

/// An upload in progress. Error paths call `abort`; dropping it without
/// `commit` or `abort` still removes the partial file.
#[derive(Debug)]
pub struct StagedAttachment {
    file: Option<tokio::fs::File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    stored_name: String,
    written: usize,
    limit: usize,
    finished: bool,
}

impl StagedAttachment {
    pub fn written(&self) -> usize {
        self.written
    }

    #[cfg(test)]
    pub fn temp_path(&self) -> &std::path::Path {
        &self.temp_path
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), error::SystemError> {
        self.written += chunk.len();
        if self.written > self.limit {
            return Err(error::SystemError::payload_too_large(format!(
                "Attachment exceeds the maximum size of {} bytes",
                self.limit
            )));
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| error::SystemError::InternalError("staged file already closed".into()))?;
        file.write_all(chunk).await?;

        Ok(())
    }

    pub async fn commit(mut self) -> Result<StoredFile, error::SystemError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        tokio::fs::rename(&self.temp_path, &self.final_path).await?;
        self.finished = true;

        Ok(StoredFile { stored_name: self.stored_name.clone(), size: self.written })
    }

    /// Discards the partial file without blocking the executor.
    pub async fn abort(mut self) {
        self.file.take();
        match tokio::fs::remove_file(&self.temp_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staged upload {}: {}", self.temp_path.display(), e),
        }
        self.finished = true;
    }
}

// Fallback for uploads dropped mid-request (client disconnects, panics).
// A single unlink of a local file, so the blocking call stays short.
impl Drop for StagedAttachment {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.file.take();
        match std::fs::remove_file(&self.temp_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staged upload {}: {}", self.temp_path.display(), e),
        }
    }
}

#[derive(Clone)]
pub struct AttachmentService {
    store: AttachmentStore,
    message_service: MessageService,
    conversation_service: ConversationService,
}

impl AttachmentService {
    pub fn with_dependencies(
        store: AttachmentStore,
        message_service: MessageService,
        conversation_service: ConversationService,
    ) -> Self {
        AttachmentService { store, message_service, conversation_service }
    }

    pub fn store(&self) -> &AttachmentStore {
        &self.store
    }

    /// Checked before any upload bytes are read.
    pub async fn ensure_can_post(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), error::SystemError> {
        self.conversation_service.require_participant(conversation_id, user_id).await?;
        Ok(())
    }

    /// Publishes the staged file and appends the message referencing it. If
    /// the append fails the published file is removed again.
    pub async fn send(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        staged: StagedAttachment,
        media: MediaType,
        original_name: &str,
        content: Option<&str>,
    ) -> Result<MessageResponse, error::SystemError> {
        let content = match normalize_content(content) {
            Ok(content) => content,
            Err(e) => {
                staged.abort().await;
                return Err(e);
            }
        };
        if staged.written() == 0 {
            staged.abort().await;
            return Err(error::SystemError::validation("Uploaded file is empty"));
        }

        let stored = staged.commit().await?;
        let attachment = Attachment {
            kind: media.kind,
            url: self.store.public_url(&stored.stored_name),
            name: display_name(original_name),
        };

        match self
            .message_service
            .send(conversation_id, sender_id, content.as_deref(), Some(attachment))
            .await
        {
            Ok(message) => {
                tracing::info!(
                    message_id = %message.id,
                    %conversation_id,
                    stored_name = %stored.stored_name,
                    size = stored.size,
                    mime = %media.mime,
                    "attachment stored"
                );
                Ok(message)
            }
            Err(e) => {
                tracing::warn!(
                    %conversation_id,
                    stored_name = %stored.stored_name,
                    "message append failed, removing attachment"
                );
                self.store.remove(&stored.stored_name).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{modules::user::service::UserService, test::MemoryStore};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store(dir: &TempDir, max_size: usize) -> AttachmentStore {
        AttachmentStore::new(AttachmentConfig {
            max_size,
            upload_dir: dir.path().join("uploads"),
            public_prefix: "/uploads/".into(),
        })
    }

    fn png() -> MediaType {
        classify(Some("image/png"), "dot.png").unwrap()
    }

    #[test]
    fn classifies_allowed_types() {
        let image = classify(Some("Image/JPEG"), "a.jpeg").unwrap();
        assert_eq!((image.kind, image.extension), (AttachmentKind::Image, "jpg"));

        let voice = classify(Some("audio/webm;codecs=opus"), "voice").unwrap();
        assert_eq!((voice.kind, voice.extension), (AttachmentKind::Audio, "webm"));

        let clip = classify(Some("video/quicktime"), "clip.mov").unwrap();
        assert_eq!((clip.kind, clip.extension), (AttachmentKind::Video, "mov"));

        let guessed = classify(Some("application/octet-stream"), "song.mp3").unwrap();
        assert_eq!(guessed.kind, AttachmentKind::Audio);

        let missing = classify(None, "photo.gif").unwrap();
        assert_eq!(missing.kind, AttachmentKind::Image);
    }

    #[test]
    fn rejects_other_types() {
        for (mime, name) in [
            (Some("application/pdf"), "doc.pdf"),
            (Some("image/svg+xml"), "logo.svg"),
            (None, "script.sh"),
            (None, "noextension"),
        ] {
            assert!(matches!(
                classify(mime, name),
                Err(error::SystemError::UnsupportedMediaType(_))
            ));
        }
    }

    #[test]
    fn display_name_drops_directories() {
        assert_eq!(display_name("../../etc/passwd"), "passwd");
        assert_eq!(display_name("C:\\Users\\me\\cat.png"), "cat.png");
        assert_eq!(display_name("holiday photo.jpg"), "holiday photo.jpg");
        assert_eq!(display_name("dir/"), FALLBACK_NAME);
        assert_eq!(display_name(".."), FALLBACK_NAME);
    }

    #[actix_web::test]
    async fn commit_publishes_under_generated_name() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 1024);

        let mut staged = store.stage(&png()).await.unwrap();
        staged.write_chunk(b"\x89PNG").await.unwrap();
        staged.write_chunk(b"rest").await.unwrap();
        let temp = staged.temp_path().to_path_buf();
        let stored = staged.commit().await.unwrap();

        assert!(stored.stored_name.ends_with(".png"));
        assert_eq!(stored.size, 8);
        assert!(!temp.exists());
        assert_eq!(std::fs::read(store.path_of(&stored.stored_name)).unwrap(), b"\x89PNGrest");
        assert_eq!(store.public_url(&stored.stored_name), format!("/uploads/{}", stored.stored_name));
    }

    #[actix_web::test]
    async fn oversize_upload_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 4);

        let mut staged = store.stage(&png()).await.unwrap();
        let temp = staged.temp_path().to_path_buf();
        staged.write_chunk(b"1234").await.unwrap();
        assert!(matches!(
            staged.write_chunk(b"5").await,
            Err(error::SystemError::PayloadTooLarge(_))
        ));
        staged.abort().await;

        assert!(!temp.exists());
        let published: Vec<_> = std::fs::read_dir(dir.path().join("uploads"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name() != STAGING_DIR)
            .collect();
        assert!(published.is_empty());
    }

    #[actix_web::test]
    async fn dropped_upload_is_removed() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, 1024);

        let mut staged = store.stage(&png()).await.unwrap();
        staged.write_chunk(b"partial").await.unwrap();
        let temp = staged.temp_path().to_path_buf();
        assert!(temp.exists());

        drop(staged);
        assert!(!temp.exists());
    }

    #[actix_web::test]
    async fn rejected_message_removes_the_file() {
        let dir = TempDir::new().unwrap();
        let memory = Arc::new(MemoryStore::default());
        let alice = memory.add_user("alice");
        let bob = memory.add_user("bob");
        let eve = memory.add_user("eve");

        let users = UserService::with_dependencies(memory.clone(), None);
        let conversations = ConversationService::with_dependencies(memory.clone(), users);
        let conversation = conversations.get_or_create(alice, bob).await.unwrap();
        let messages = MessageService::with_dependencies(memory.clone(), conversations.clone());
        let svc = AttachmentService::with_dependencies(store(&dir, 1024), messages, conversations);

        assert!(svc.ensure_can_post(conversation, eve).await.is_err());

        let mut staged = svc.store().stage(&png()).await.unwrap();
        staged.write_chunk(b"data").await.unwrap();
        let result = svc.send(conversation, eve, staged, png(), "dot.png", None).await;

        assert!(matches!(result, Err(error::SystemError::NotFound(_))));
        let published = std::fs::read_dir(dir.path().join("uploads"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name() != STAGING_DIR)
            .count();
        assert_eq!(published, 0);
        assert_eq!(memory.message_count(), 0);
    }

    #[actix_web::test]
    async fn attachment_message_carries_url_and_name() {
        let dir = TempDir::new().unwrap();
        let memory = Arc::new(MemoryStore::default());
        let alice = memory.add_user("alice");
        let bob = memory.add_user("bob");

        let users = UserService::with_dependencies(memory.clone(), None);
        let conversations = ConversationService::with_dependencies(memory.clone(), users);
        let conversation = conversations.get_or_create(alice, bob).await.unwrap();
        let messages = MessageService::with_dependencies(memory.clone(), conversations.clone());
        let svc = AttachmentService::with_dependencies(store(&dir, 1024), messages, conversations);

        let mut staged = svc.store().stage(&png()).await.unwrap();
        staged.write_chunk(b"data").await.unwrap();
        let message = svc
            .send(conversation, alice, staged, png(), "../me/dot.png", Some("  look "))
            .await
            .unwrap();

        assert_eq!(message.content.as_deref(), Some("look"));
        assert_eq!(message.attachment_type, Some(AttachmentKind::Image));
        assert_eq!(message.attachment_name.as_deref(), Some("dot.png"));
        let url = message.attachment_url.unwrap();
        let stored_name = url.strip_prefix("/uploads/").unwrap();
        assert!(svc.store().path_of(stored_name).exists());
    }

    #[actix_web::test]
    async fn empty_upload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let memory = Arc::new(MemoryStore::default());
        let alice = memory.add_user("alice");
        let bob = memory.add_user("bob");

        let users = UserService::with_dependencies(memory.clone(), None);
        let conversations = ConversationService::with_dependencies(memory.clone(), users);
        let conversation = conversations.get_or_create(alice, bob).await.unwrap();
        let messages = MessageService::with_dependencies(memory.clone(), conversations.clone());
        let svc = AttachmentService::with_dependencies(store(&dir, 1024), messages, conversations);

        let staged = svc.store().stage(&png()).await.unwrap();
        let temp = staged.temp_path().to_path_buf();
        let result = svc.send(conversation, alice, staged, png(), "dot.png", None).await;

        assert!(matches!(result, Err(error::SystemError::Validation(_))));
        assert!(!temp.exists());
        assert_eq!(memory.message_count(), 0);
    }
}
