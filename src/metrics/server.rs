use actix_web::dev::Server;
use actix_web::{web, App, HttpResponse, HttpServer};
use prometheus::{Encoder, Registry, TextEncoder};

const SERVICE_NAME: &str = "customer-service";

/// Bind the scrape endpoint (`/metrics`) and liveness check (`/health`).
/// Nothing is served until the returned `Server` is awaited.
pub fn metrics_server(registry: Registry, host: &str, port: u16) -> std::io::Result<Server> {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(registry.clone()))
            .configure(routes)
    })
    .workers(1)
    .bind((host, port))?
    .run();

    tracing::info!(host, port, "Metrics endpoint bound");
    Ok(server)
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(scrape))
        .route("/health", web::get().to(liveness));
}

async fn scrape(registry: web::Data<Registry>) -> HttpResponse {
    let encoder = TextEncoder::new();
    let mut body = Vec::new();

    match encoder.encode(&registry.gather(), &mut body) {
        Ok(()) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(body),
        Err(e) => {
            tracing::error!(error = %e, "Metric families could not be encoded");
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "service": SERVICE_NAME,
        "status": "up",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use prometheus::IntCounter;

    #[actix_web::test]
    async fn test_scrape_renders_registered_counters() {
        let registry = Registry::new();
        let counter = IntCounter::new("balance_smoke_total", "Smoke counter").unwrap();
        registry.register(Box::new(counter.clone())).unwrap();
        counter.inc();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(registry))
                .configure(routes),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
        assert!(resp.status().is_success());
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));

        let body = test::read_body(resp).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("balance_smoke_total 1"));
    }

    #[actix_web::test]
    async fn test_liveness_names_service() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Registry::new()))
                .configure(routes),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["service"], SERVICE_NAME);
        assert_eq!(body["status"], "up");
    }
}
