use crate::db::PgPool;
use crate::ledger::stats::global_stats;
use actix_web::{get, middleware, web, App, HttpResponse, HttpServer, Responder};

pub async fn run_http_server(pool: PgPool, port: u16) -> std::io::Result<()> {
    tracing::info!("Starting HTTP server on port {}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(middleware::Logger::default())
            .service(health)
            .service(stats)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

#[get("/health")]
async fn health() -> impl Responder {
    tracing::info!("Health check");
    "I'm ok"
}

#[get("/stats")]
async fn stats(pool: web::Data<PgPool>) -> impl Responder {
    match global_stats(&pool) {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => {
            tracing::error!("Failed to load global stats: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}
