use actix_cors::Cors;
use actix_web::{
    self, App, HttpServer,
    http::header,
    middleware::{Logger, from_fn},
    web,
};
use std::sync::{Arc, LazyLock};

use crate::{
    configs::{RedisCache, connect_database, run_migrations},
    middlewares::authentication,
    modules::{
        attachment::{
            model::AttachmentConfig,
            service::{AttachmentService, AttachmentStore},
        },
        conversation::{repository_pg::ConversationPgRepository, service::ConversationService},
        message::{repository_pg::MessageRepositoryPg, service::MessageService},
        user::{repository_pg::UserRepositoryPg, service::UserService},
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check(db_pool: web::Data<sqlx::PgPool>) -> Result<&'static str, api::error::Error> {
    sqlx::query("SELECT 1")
        .execute(db_pool.get_ref())
        .await
        .map_err(api::error::SystemError::from)?;
    Ok("Server is running")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    if tracing::subscriber::set_global_default(tracing_subscriber::fmt().finish()).is_err() {
        log::warn!("A tracing subscriber was already installed");
    }
    log::info!("Environment variables loaded");

    let db_pool = connect_database(&ENV)
        .await
        .map_err(|_| std::io::Error::other("Database connection error"))?;
    run_migrations(&db_pool).await.map_err(|e| std::io::Error::other(e.to_string()))?;

    let redis_cache = match ENV.redis_url.as_deref() {
        Some(url) => Some(Arc::new(
            RedisCache::new(url).map_err(|_| std::io::Error::other("Redis connection error"))?,
        )),
        None => None,
    };

    let user_repo = Arc::new(UserRepositoryPg::new(db_pool.clone()));
    let conversation_repo = Arc::new(ConversationPgRepository::new(db_pool.clone()));
    let message_repo = Arc::new(MessageRepositoryPg::new(db_pool.clone()));

    let user_service = UserService::with_dependencies(user_repo, redis_cache);
    let conversation_service =
        ConversationService::with_dependencies(conversation_repo, user_service);
    let message_service =
        MessageService::with_dependencies(message_repo, conversation_service.clone());
    let attachment_service = AttachmentService::with_dependencies(
        AttachmentStore::new(AttachmentConfig::from_env(&ENV)),
        message_service.clone(),
        conversation_service.clone(),
    );

    std::fs::create_dir_all(ENV.upload_dir())?;

    let server_pool = db_pool.clone();
    println!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&ENV.frontend_url)
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
            .supports_credentials();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(conversation_service.clone()))
            .app_data(web::Data::new(message_service.clone()))
            .app_data(web::Data::new(attachment_service.clone()))
            .app_data(web::Data::new(server_pool.clone()))
            .app_data(utils::json_config())
            .app_data(utils::query_config())
            .app_data(utils::path_config())
            .service(health_check)
            .service(actix_files::Files::new(&ENV.upload_url_prefix, ENV.upload_dir()))
            .service(
                web::scope("/api")
                    .wrap(from_fn(authentication))
                    .configure(modules::conversation::route::configure)
                    .configure(modules::message::route::configure),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(2)
    .run()
    .await?;

    db_pool.close().await;
    Ok(())
}
