// src/main.rs
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, middleware, Responder};
use actix_cors::Cors;
use grader_console::api::{configure_routes, handlers::ws, AppState};
use grader_console::banner;
use grader_console::client::HttpJobClient;
use grader_console::config::AppConfig;
use rust_embed::RustEmbed;
use std::borrow::Cow;

#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    banner::print_banner();

    if let Err(e) = dotenvy::dotenv() {
        eprintln!("⚠️  No .env file loaded ({}), using the process environment", e);
    }

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let app_config = AppConfig::from_env().map_err(std::io::Error::other)?;
    let client = HttpJobClient::from_config(&app_config).map_err(std::io::Error::other)?;
    log::info!("Using evaluation backend at {}", client.base_url());

    let bind = app_config.bind.clone();
    let state = AppState::new(app_config, client);

    let listing = state.load_organizations().await;
    if let Some(error) = &listing.error {
        log::warn!("Starting with an empty organization list: {}", error);
    }

    let broker = ws::WsBroker::new();
    actix_web::rt::spawn(ws::forward_events(state.controller.subscribe(), broker.clone()));

    println!("🚀 Starting server...");
    println!("📊 Dashboard available at http://{}", bind);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(broker.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
            .route("/{_:.*}", web::get().to(static_file_handler))
    })
    .bind(bind.as_str())?
    .run()
    .await
}

/// Maps a request path onto an embedded asset name.
fn asset_path(request_path: &str) -> &str {
    match request_path.trim_start_matches('/') {
        "" => "index.html",
        path => path,
    }
}

async fn static_file_handler(req: HttpRequest) -> impl Responder {
    let path = asset_path(req.path());

    match StaticAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            HttpResponse::Ok().content_type(mime.as_ref()).body(Cow::into_owned(content.data))
        }
        None => HttpResponse::NotFound().body("404 Not Found"),
    }
}
