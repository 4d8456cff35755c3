use actix_web::web::{ServiceConfig, scope};

use crate::modules::message::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/messages")
            .service(edit_message)
            .service(delete_message)
            .service(get_edit_history),
    )
    .service(get_unread_count);
}
