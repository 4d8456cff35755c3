use actix_web::{HttpRequest, delete, get, patch, post, web};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::message::{
        model::{
            EditHistoryResponse, EditMessageRequest, GetMessagesQuery, MessageEnvelope,
            MessagesResponse, SendMessageRequest, UnreadCountResponse,
        },
        service::MessageService,
    },
    utils::{ValidatedJson, ValidatedQuery},
};

#[get("/{conversation_id}/messages")]
pub async fn get_messages(
    message_service: web::Data<MessageService>,
    conversation_id: web::Path<Uuid>,
    query: ValidatedQuery<GetMessagesQuery>,
    req: HttpRequest,
) -> Result<success::Success<MessagesResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let query = query.0;

    let messages =
        message_service.list_page(*conversation_id, user_id, query.before, query.limit).await?;

    Ok(success::Success::ok(MessagesResponse { messages }))
}

#[post("/{conversation_id}/messages")]
pub async fn send_message(
    message_service: web::Data<MessageService>,
    conversation_id: web::Path<Uuid>,
    body: ValidatedJson<SendMessageRequest>,
    req: HttpRequest,
) -> Result<success::Success<MessageEnvelope>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let message =
        message_service.send(*conversation_id, user_id, body.0.content.as_deref(), None).await?;

    Ok(success::Success::created(MessageEnvelope { message }))
}

#[patch("/{message_id}")]
pub async fn edit_message(
    message_service: web::Data<MessageService>,
    message_id: web::Path<Uuid>,
    body: ValidatedJson<EditMessageRequest>,
    req: HttpRequest,
) -> Result<success::Success<MessageEnvelope>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let message = message_service.edit(*message_id, user_id, &body.0.content).await?;

    Ok(success::Success::ok(MessageEnvelope { message }))
}

#[delete("/{message_id}")]
pub async fn delete_message(
    message_service: web::Data<MessageService>,
    message_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<success::Ack>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    message_service.delete(*message_id, user_id).await?;

    Ok(success::Success::ok(success::Ack::done()).message("Message deleted"))
}

#[get("/{message_id}/history")]
pub async fn get_edit_history(
    message_service: web::Data<MessageService>,
    message_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<EditHistoryResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let history = message_service.edit_history(*message_id, user_id).await?;

    Ok(success::Success::ok(EditHistoryResponse { history }))
}

#[get("/unread-count")]
pub async fn get_unread_count(
    message_service: web::Data<MessageService>,
    req: HttpRequest,
) -> Result<success::Success<UnreadCountResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let unread_count = message_service.unread_count(user_id).await?;

    Ok(success::Success::ok(UnreadCountResponse { unread_count }))
}
