// src/api/routes.rs
use actix_web::web;
use super::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_check))
            .route("/ws", web::get().to(handlers::ws_handler))
            .service(
                web::scope("/organizations")
                    .route("", web::get().to(handlers::list_organizations))
                    .route("/reload", web::post().to(handlers::reload_organizations))
            )
            .route("/evaluations", web::post().to(handlers::start_evaluation))
            .route("/job", web::get().to(handlers::get_job))
            .service(
                web::scope("/results")
                    .route("", web::get().to(handlers::list_results))
                    .route("/{position}", web::get().to(handlers::get_result))
            )
    );
}
