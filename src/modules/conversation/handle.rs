use actix_web::{HttpRequest, get, post, web};

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::conversation::{
        model::{ConversationListResponse, StartConversationRequest, StartConversationResponse},
        service::ConversationService,
    },
    utils::ValidatedJson,
};

#[get("")]
pub async fn list_conversations(
    conversation_svc: web::Data<ConversationService>,
    req: HttpRequest,
) -> Result<success::Success<ConversationListResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let conversations = conversation_svc.list_for_user(user_id).await?;

    Ok(success::Success::ok(ConversationListResponse { conversations }))
}

#[post("")]
pub async fn start_conversation(
    conversation_svc: web::Data<ConversationService>,
    body: ValidatedJson<StartConversationRequest>,
    req: HttpRequest,
) -> Result<success::Success<StartConversationResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;

    let conversation_id = conversation_svc.get_or_create(user_id, body.0.user_id).await?;

    Ok(success::Success::ok(StartConversationResponse { conversation_id }))
}
