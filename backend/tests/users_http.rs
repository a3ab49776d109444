//! End-to-end tests for the users REST surface over an in-memory store.

use std::sync::Arc;

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use users_backend::Trace;
use users_backend::domain::ports::UserPersistenceError;
use users_backend::domain::{RetryPolicy, TRACE_ID_HEADER, User, UserDraft, UserId, UserService};
use users_backend::inbound::http::configure;
use users_backend::inbound::http::state::HttpState;
use users_backend::test_support::{ImmediateSleeper, InMemoryUserRepository};

#[fixture]
fn repository() -> Arc<InMemoryUserRepository> {
    Arc::new(InMemoryUserRepository::default())
}

async fn users_app(
    repository: Arc<InMemoryUserRepository>,
) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    let service =
        UserService::with_sleeper(repository, RetryPolicy::default(), Arc::new(ImmediateSleeper));
    actix_test::init_service(
        App::new()
            .app_data(web::Data::new(HttpState::from_service(service)))
            .wrap(Trace)
            .configure(configure),
    )
    .await
}

async fn send<S>(app: &S, request: actix_test::TestRequest) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let response = actix_test::call_service(app, request.to_request()).await;
    let status = response.status();
    let body = actix_test::read_body(response).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn created_id(body: &Value) -> String {
    body.get("_id")
        .and_then(Value::as_str)
        .expect("create returns _id")
        .to_owned()
}

fn is_object_id(raw: &str) -> bool {
    raw.len() == 24 && raw.chars().all(|c| c.is_ascii_hexdigit())
}

#[rstest]
#[actix_web::test]
async fn create_delete_walkthrough(repository: Arc<InMemoryUserRepository>) {
    let app = users_app(repository).await;

    let (status, created) = send(
        &app,
        actix_test::TestRequest::post()
            .uri("/users")
            .set_json(json!({ "nombre": "Ana", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created_id(&created);
    assert!(is_object_id(&id), "unexpected id {id}");
    assert_eq!(created.get("nombre"), Some(&json!("Ana")));
    assert_eq!(created.get("password"), Some(&json!("x")));

    let (status, fetched) = send(
        &app,
        actix_test::TestRequest::get().uri(&format!("/users/{id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, json!({ "id": id, "nombre": "Ana", "password": "x" }));

    let (status, deleted) = send(
        &app,
        actix_test::TestRequest::delete().uri(&format!("/users/{id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        deleted,
        json!({ "message": "Usuario eliminado correctamente" })
    );

    let (status, missing) = send(
        &app,
        actix_test::TestRequest::get().uri(&format!("/users/{id}")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing.get("code"), Some(&json!("not_found")));
}

#[rstest]
#[actix_web::test]
async fn update_replaces_fields_without_merging(repository: Arc<InMemoryUserRepository>) {
    let app = users_app(repository).await;
    let (_, created) = send(
        &app,
        actix_test::TestRequest::post().uri("/users").set_json(
            json!({ "nombre": "Ana", "password": "x", "email": "ana@example.com", "age": 30 }),
        ),
    )
    .await;
    let id = created_id(&created);

    let (status, updated) = send(
        &app,
        actix_test::TestRequest::put()
            .uri(&format!("/users/{id}"))
            .set_json(json!({ "nombre": "Bea", "password": "y" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        updated,
        json!({ "message": "Usuario actualizado correctamente" })
    );

    let (_, fetched) = send(
        &app,
        actix_test::TestRequest::get().uri(&format!("/users/{id}")),
    )
    .await;
    assert_eq!(fetched, json!({ "id": id, "nombre": "Bea", "password": "y" }));
}

#[actix_web::test]
async fn update_drops_attributes_stored_before_the_replacement() {
    let id = UserId::generate();
    let mut attributes = serde_json::Map::new();
    attributes.insert("rol".into(), json!("admin"));
    let seeded = User::new(id, UserDraft::new("Ana", "x").expect("valid draft"))
        .with_attributes(attributes);
    let app = users_app(Arc::new(InMemoryUserRepository::with_users([seeded]))).await;

    let (status, _) = send(
        &app,
        actix_test::TestRequest::put()
            .uri(&format!("/users/{id}"))
            .set_json(json!({ "nombre": "Bea", "password": "y" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, fetched) = send(
        &app,
        actix_test::TestRequest::get().uri(&format!("/users/{id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        fetched,
        json!({ "id": id.to_string(), "nombre": "Bea", "password": "y" })
    );
}

#[rstest]
#[case(actix_test::TestRequest::get().uri("/users/abc"))]
#[case(actix_test::TestRequest::put().uri("/users/abc").set_json(json!({ "nombre": "Ana", "password": "x" })))]
#[case(actix_test::TestRequest::delete().uri("/users/abc"))]
#[actix_web::test]
async fn malformed_ids_never_reach_the_store(#[case] request: actix_test::TestRequest) {
    let repository = Arc::new(InMemoryUserRepository::default());
    // A queued outage would surface as 503 if the store were called.
    repository.queue_failures([UserPersistenceError::connection("refused")]);
    let app = users_app(repository).await;

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body.get("code"), Some(&json!("not_found")));
}

#[rstest]
#[actix_web::test]
async fn empty_store_lists_no_users_marker(repository: Arc<InMemoryUserRepository>) {
    let app = users_app(repository).await;

    let (status, body) = send(&app, actix_test::TestRequest::get().uri("/users")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "No hay usuarios registrados" }));
}

#[rstest]
#[actix_web::test]
async fn listing_returns_created_users_in_order(repository: Arc<InMemoryUserRepository>) {
    let app = users_app(repository).await;
    let mut ids = Vec::new();
    for name in ["Ana", "Bea"] {
        let (_, created) = send(
            &app,
            actix_test::TestRequest::post()
                .uri("/users")
                .set_json(json!({ "nombre": name, "password": "x" })),
        )
        .await;
        ids.push(created_id(&created));
    }

    let (status, body) = send(&app, actix_test::TestRequest::get().uri("/users")).await;

    assert_eq!(status, StatusCode::OK);
    let listed: Vec<&str> = body
        .get("usuarios")
        .and_then(Value::as_array)
        .expect("usuarios array")
        .iter()
        .filter_map(|user| user.get("_id").and_then(Value::as_str))
        .collect();
    assert_eq!(listed, ids);
}

#[rstest]
#[actix_web::test]
async fn transient_outage_is_retried_transparently(repository: Arc<InMemoryUserRepository>) {
    repository.queue_failures([
        UserPersistenceError::connection("refused"),
        UserPersistenceError::timeout("slow"),
    ]);
    let app = users_app(repository).await;

    let (status, body) = send(&app, actix_test::TestRequest::get().uri("/users")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "No hay usuarios registrados" }));
}

#[rstest]
#[actix_web::test]
async fn persistent_outage_is_service_unavailable(repository: Arc<InMemoryUserRepository>) {
    repository.queue_failures(
        std::iter::repeat_with(|| UserPersistenceError::connection("refused")).take(3),
    );
    let app = users_app(repository).await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::get().uri("/users").to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .expect("trace id header");
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body.get("code"), Some(&json!("service_unavailable")));
    assert_eq!(body.get("traceId").and_then(Value::as_str), Some(header.as_str()));
}
