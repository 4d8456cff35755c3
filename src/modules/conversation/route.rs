use actix_web::web::{ServiceConfig, scope};

use crate::modules::{attachment, conversation::handle::*, message};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/conversations")
            .service(list_conversations)
            .service(start_conversation)
            .service(message::handle::get_messages)
            .service(message::handle::send_message)
            .service(attachment::handle::send_attachment),
    );
}
