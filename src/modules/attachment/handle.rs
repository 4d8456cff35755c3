use actix_multipart::{Field, Multipart};
use actix_web::{HttpRequest, post, web};
use futures_util::TryStreamExt;
use uuid::Uuid;

use crate::{
    api::{error, success},
    constants::MAX_MESSAGE_LENGTH,
    middlewares::get_claims,
    modules::{
        attachment::{
            model::MediaType,
            service::{AttachmentService, StagedAttachment, classify},
        },
        message::model::MessageEnvelope,
    },
};

// utf-8 upper bound for a caption that passes the length check after trimming,
// plus room for surrounding whitespace
const MAX_CONTENT_FIELD_BYTES: usize = MAX_MESSAGE_LENGTH * 4 + 1024;

fn multipart_error(e: actix_multipart::MultipartError) -> error::Error {
    error::Error::bad_request(format!("Malformed multipart body: {}", e))
}

type Upload = (StagedAttachment, MediaType, String);

async fn stream_field(field: &mut Field, staged: &mut StagedAttachment) -> Result<(), error::Error> {
    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        staged.write_chunk(&chunk).await?;
    }
    Ok(())
}

/// Walks the multipart parts. A staged file is left in `upload` even when a
/// later part fails, so the caller can discard it.
async fn read_parts(
    attachment_service: &AttachmentService,
    payload: &mut Multipart,
    upload: &mut Option<Upload>,
    content: &mut Option<String>,
) -> Result<(), error::Error> {
    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                if upload.is_some() {
                    return Err(error::Error::bad_request("Only one file can be attached"));
                }

                let original_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or_default()
                    .to_string();
                let declared = field.content_type().map(|m| m.essence_str().to_string());
                let media = classify(declared.as_deref(), &original_name)?;

                let mut staged = attachment_service.store().stage(&media).await?;
                if let Err(e) = stream_field(&mut field, &mut staged).await {
                    staged.abort().await;
                    return Err(e);
                }

                *upload = Some((staged, media, original_name));
            }
            Some("content") => {
                let mut bytes = Vec::new();
                while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
                    bytes.extend_from_slice(&chunk);
                    if bytes.len() > MAX_CONTENT_FIELD_BYTES {
                        return Err(error::Error::bad_request(format!(
                            "Message cannot exceed {} characters",
                            MAX_MESSAGE_LENGTH
                        )));
                    }
                }
                let text = String::from_utf8(bytes)
                    .map_err(|_| error::Error::bad_request("Message content must be UTF-8 text"))?;
                *content = Some(text);
            }
            _ => {
                // drain unknown parts
                while field.try_next().await.map_err(multipart_error)?.is_some() {}
            }
        }
    }
    Ok(())
}

/// Accepts a multipart body with a required `file` part and an optional
/// `content` part. The file is streamed to staging storage as it arrives.
#[post("/{conversation_id}/attachment")]
pub async fn send_attachment(
    attachment_service: web::Data<AttachmentService>,
    conversation_id: web::Path<Uuid>,
    mut payload: Multipart,
    req: HttpRequest,
) -> Result<success::Success<MessageEnvelope>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let conversation_id = conversation_id.into_inner();

    attachment_service.ensure_can_post(conversation_id, user_id).await?;

    let mut upload: Option<Upload> = None;
    let mut content: Option<String> = None;

    if let Err(e) = read_parts(&attachment_service, &mut payload, &mut upload, &mut content).await {
        if let Some((staged, _, _)) = upload.take() {
            staged.abort().await;
        }
        return Err(e);
    }

    let (staged, media, original_name) =
        upload.ok_or_else(|| error::Error::bad_request("No file uploaded"))?;

    let message = attachment_service
        .send(conversation_id, user_id, staged, media, &original_name, content.as_deref())
        .await?;

    Ok(success::Success::created(MessageEnvelope { message }))
}
