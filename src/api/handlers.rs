use actix_cors::Cors;
use actix_web::{web, HttpResponse};

use super::dto::{CreateCustomerRequest, CustomerResponse, UpdateCustomerRequest};
use super::error::ApiError;
use crate::domain::customer::{CustomerId, CustomerUpdate, NewCustomer};
use crate::workflow::CustomerWorkflow;

// ============================================================================
// /customers routes
// ============================================================================

pub const CUSTOMER_GROUP_PATH: &str = "/customers";

/// Register the customer routes on an actix `App` or scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(CUSTOMER_GROUP_PATH)
            .app_data(json_config())
            .route("", web::get().to(find_all))
            .route("", web::post().to(create))
            .route("/{id}", web::get().to(find_by_id))
            .route("/{id}", web::put().to(update))
            .route("/{id}", web::delete().to(delete)),
    );
}

/// Allow-all CORS for the customer API: any origin (answered with `*`),
/// any method, any header.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

fn parse_id(raw: &str) -> Result<CustomerId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid customer id: {raw}")))
}

async fn find_all(workflow: web::Data<CustomerWorkflow>) -> Result<HttpResponse, ApiError> {
    let customers = workflow.get_all().await?;
    let body: Vec<CustomerResponse> = customers.into_iter().map(CustomerResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

async fn find_by_id(
    workflow: web::Data<CustomerWorkflow>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let customer = workflow.get_by_id(id).await?;
    Ok(HttpResponse::Ok().json(CustomerResponse::from(customer)))
}

async fn create(
    workflow: web::Data<CustomerWorkflow>,
    body: web::Json<CreateCustomerRequest>,
) -> Result<HttpResponse, ApiError> {
    let valid = body.validate().map_err(ApiError::Validation)?;
    let customer = workflow
        .create(NewCustomer::new(valid.name, valid.email))
        .await?;
    Ok(HttpResponse::Created().json(CustomerResponse::from(customer)))
}

async fn update(
    workflow: web::Data<CustomerWorkflow>,
    path: web::Path<String>,
    body: web::Json<UpdateCustomerRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    let valid = body.validate().map_err(ApiError::Validation)?;
    let customer = workflow
        .update(CustomerUpdate {
            id,
            name: valid.name,
            email: valid.email,
        })
        .await?;
    Ok(HttpResponse::Ok().json(CustomerResponse::from(customer)))
}

async fn delete(
    workflow: web::Data<CustomerWorkflow>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&path)?;
    workflow.delete(id).await?;
    Ok(HttpResponse::Ok().json("Customer deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::{BalanceClient, BalanceError};
    use crate::repository::InMemoryCustomerRepository;
    use actix_web::http::{header, Method, StatusCode};
    use actix_web::{test, App};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct FixedBalance(bool);

    #[async_trait]
    impl BalanceClient for FixedBalance {
        async fn create_balance(&self, _customer_id: CustomerId) -> Result<(), BalanceError> {
            if self.0 {
                Ok(())
            } else {
                Err(BalanceError::Transport("connection refused".to_string()))
            }
        }
    }

    fn workflow(balance_ok: bool) -> CustomerWorkflow {
        CustomerWorkflow::new(
            Arc::new(InMemoryCustomerRepository::new()),
            Arc::new(FixedBalance(balance_ok)),
        )
    }

    macro_rules! app {
        ($workflow:expr) => {
            test::init_service(
                App::new()
                    .wrap(cors())
                    .app_data(web::Data::new($workflow))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_create_then_fetch() {
        let app = app!(workflow(true));

        let req = test::TestRequest::post()
            .uri("/customers")
            .set_json(json!({ "nome": "Joana", "email": "joana@bank.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: CustomerResponse = test::read_body_json(resp).await;
        assert_eq!(
            created,
            CustomerResponse {
                id: 1,
                nome: "Joana".to_string(),
                email: "joana@bank.com".to_string(),
            }
        );

        let req = test::TestRequest::get().uri("/customers/1").to_request();
        let fetched: CustomerResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched, created);

        let req = test::TestRequest::get().uri("/customers").to_request();
        let all: Vec<CustomerResponse> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(all, vec![created]);
    }

    #[actix_web::test]
    async fn test_cors_allows_any_origin() {
        let app = app!(workflow(true));

        let req = test::TestRequest::get()
            .uri("/customers")
            .insert_header((header::ORIGIN, "https://backoffice.bank.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[actix_web::test]
    async fn test_cors_preflight_answered() {
        let app = app!(workflow(true));

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/customers")
            .insert_header((header::ORIGIN, "https://backoffice.bank.example"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[actix_web::test]
    async fn test_balance_failure_is_unprocessable() {
        let app = app!(workflow(false));

        let req = test::TestRequest::post()
            .uri("/customers")
            .set_json(json!({ "nome": "Joana", "email": "joana@bank.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let req = test::TestRequest::get().uri("/customers").to_request();
        let all: Vec<CustomerResponse> = test::call_and_read_body_json(&app, req).await;
        assert!(all.is_empty());
    }

    #[actix_web::test]
    async fn test_duplicate_email_is_conflict() {
        let app = app!(workflow(true));

        for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
            let req = test::TestRequest::post()
                .uri("/customers")
                .set_json(json!({ "nome": "Joana", "email": "joana@bank.com" }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), expected);
        }
    }

    #[actix_web::test]
    async fn test_validation_errors_listed() {
        let app = app!(workflow(true));

        let req = test::TestRequest::post()
            .uri("/customers")
            .set_json(json!({ "nome": "", "email": "joana" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"][0]["field"], "nome");
        assert_eq!(body["errors"][1]["field"], "email");
    }

    #[actix_web::test]
    async fn test_malformed_json_is_bad_request() {
        let app = app!(workflow(true));

        let req = test::TestRequest::post()
            .uri("/customers")
            .insert_header(("content-type", "application/json"))
            .set_payload("{ not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_bad_and_missing_ids() {
        let app = app!(workflow(true));

        let req = test::TestRequest::get().uri("/customers/abc").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/customers/7").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::put()
            .uri("/customers/7")
            .set_json(json!({ "nome": "A", "email": "a@x.com" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete().uri("/customers/7").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_update_and_delete() {
        let app = app!(workflow(true));

        let req = test::TestRequest::post()
            .uri("/customers")
            .set_json(json!({ "nome": "Joana", "email": "joana@bank.com" }))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::put()
            .uri("/customers/1")
            .set_json(json!({ "nome": "A", "email": "a@x.com" }))
            .to_request();
        let updated: CustomerResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated.id, 1);
        assert_eq!(updated.nome, "A");
        assert_eq!(updated.email, "a@x.com");

        let req = test::TestRequest::delete().uri("/customers/1").to_request();
        let message: String = test::call_and_read_body_json(&app, req).await;
        assert_eq!(message, "Customer deleted successfully");

        let req = test::TestRequest::get().uri("/customers/1").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
