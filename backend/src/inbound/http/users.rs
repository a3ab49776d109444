//! Users API handlers.
//!
//! ```text
//! GET    /
//! GET    /users
//! GET    /users/{id}
//! POST   /users        {"nombre":"Ana","password":"x"}
//! PUT    /users/{id}   {"nombre":"Ana","password":"y"}
//! DELETE /users/{id}
//! ```
//!
//! Identifiers are decoded before any store call; a malformed identifier is
//! reported exactly like a missing user.

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use utoipa::ToSchema;

use crate::domain::{Error, User, UserDraft, UserId, UserValidationError, USER_NOT_FOUND};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Plain-text greeting served at the root path.
pub const WELCOME: &str = "Bienvenido a la API de usuarios";
/// Marker returned by list when the store holds no users.
pub const NO_USERS: &str = "No hay usuarios registrados";
/// Confirmation returned after a successful update.
pub const USER_UPDATED: &str = "Usuario actualizado correctamente";
/// Confirmation returned after a successful delete.
pub const USER_DELETED: &str = "Usuario eliminado correctamente";

/// Request body for create and update.
///
/// Example JSON:
/// `{"nombre":"Ana","password":"x","email":"ana@example.com","age":30}`
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UserBody {
    /// Required display name; `name` is accepted as an alias.
    #[serde(default, alias = "name")]
    #[schema(example = "Ana")]
    pub nombre: Option<String>,
    /// Required password, stored as given.
    #[serde(default)]
    #[schema(example = "x")]
    pub password: Option<String>,
    /// Optional email address; must contain an `@`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Optional age in years.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u16>,
}

impl TryFrom<UserBody> for UserDraft {
    type Error = UserValidationError;

    fn try_from(value: UserBody) -> Result<Self, Self::Error> {
        let UserBody {
            nombre,
            password,
            email,
            age,
        } = value;
        UserDraft::new(nombre.unwrap_or_default(), password.unwrap_or_default())?
            .with_email(email)
            .map(|draft| draft.with_age(age))
    }
}

fn map_validation_error(err: UserValidationError) -> Error {
    Error::invalid_request(err.to_string()).with_details(json!({
        "field": err.field(),
        "code": err.reason(),
    }))
}

/// User as returned by `GET /users/{id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserView {
    /// 24-character hex identifier.
    #[schema(example = "64b7f0c2a1b2c3d4e5f60718")]
    pub id: String,
    /// Display name.
    pub nombre: String,
    /// Stored password.
    pub password: String,
    /// Email address, when stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Age, when stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u16>,
}

/// User as returned by list and create, keyed by the store field `_id`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StoredUserView {
    /// 24-character hex identifier, under the store's key.
    #[serde(rename = "_id")]
    #[schema(example = "64b7f0c2a1b2c3d4e5f60718")]
    pub id: String,
    /// Display name.
    pub nombre: String,
    /// Stored password.
    pub password: String,
    /// Email address, when stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Age, when stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u16>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            nombre: user.name().to_owned(),
            password: user.password().to_owned(),
            email: user.email().map(str::to_owned),
            age: user.age(),
        }
    }
}

impl From<&User> for StoredUserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            nombre: user.name().to_owned(),
            password: user.password().to_owned(),
            email: user.email().map(str::to_owned),
            age: user.age(),
        }
    }
}

/// Listing payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct UsersListResponse {
    /// Users in store order, with any extra stored attributes.
    #[schema(value_type = Vec<StoredUserView>)]
    pub usuarios: Vec<Value>,
}

/// Message-only payload used for confirmations and the empty listing.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// Human-readable outcome.
    #[schema(example = "Usuario eliminado correctamente")]
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_owned(),
        }
    }
}

/// Serialise a view and append the user's unmodelled attributes.
fn render<V: Serialize>(view: V, user: &User) -> ApiResult<Value> {
    let mut value = serde_json::to_value(view)
        .map_err(|err| Error::internal(format!("failed to encode user: {err}")))?;
    if let Value::Object(fields) = &mut value {
        merge_attributes(fields, user.attributes());
    }
    Ok(value)
}

fn merge_attributes(fields: &mut Map<String, Value>, attributes: &Map<String, Value>) {
    for (key, attribute) in attributes {
        fields
            .entry(key.clone())
            .or_insert_with(|| attribute.clone());
    }
}

fn parse_id(raw: &str) -> ApiResult<UserId> {
    UserId::parse(raw).map_err(|_| Error::not_found(USER_NOT_FOUND))
}

/// Welcome text.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Welcome text", body = String, content_type = "text/plain")),
    tags = ["users"],
    operation_id = "welcome"
)]
#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(WELCOME)
}

/// List up to 100 users in store order.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use users_backend::inbound::http::users::list_users;
///
/// let app = App::new().service(list_users);
/// ```
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Users, or the no-users marker", body = UsersListResponse),
        (status = 500, description = "Internal server error", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let users = state.users.list_users().await?;
    if users.is_empty() {
        return Ok(HttpResponse::Ok().json(MessageResponse::new(NO_USERS)));
    }
    let usuarios = users
        .iter()
        .map(|user| render(StoredUserView::from(user), user))
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(HttpResponse::Ok().json(UsersListResponse { usuarios }))
}

/// Fetch one user.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = String, Path, description = "24-character hex identifier")),
    responses(
        (status = 200, description = "User", body = UserView),
        (status = 404, description = "Not found", body = Error),
        (status = 500, description = "Internal server error", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["users"],
    operation_id = "getUser"
)]
#[get("/users/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path)?;
    let user = state.users.get_user(&id).await?;
    Ok(HttpResponse::Ok().json(render(UserView::from(&user), &user)?))
}

/// Create a user.
#[utoipa::path(
    post,
    path = "/users",
    request_body = UserBody,
    responses(
        (status = 200, description = "Created user", body = StoredUserView),
        (status = 400, description = "Invalid request", body = Error),
        (status = 500, description = "Internal server error", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["users"],
    operation_id = "createUser"
)]
#[post("/users")]
pub async fn create_user(
    state: web::Data<HttpState>,
    payload: web::Json<UserBody>,
) -> ApiResult<HttpResponse> {
    let draft = UserDraft::try_from(payload.into_inner()).map_err(map_validation_error)?;
    let user = state.users_command.create_user(draft).await?;
    Ok(HttpResponse::Ok().json(render(StoredUserView::from(&user), &user)?))
}

/// Replace the fields of a user.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = String, Path, description = "24-character hex identifier")),
    request_body = UserBody,
    responses(
        (status = 200, description = "Updated", body = MessageResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Not found", body = Error),
        (status = 500, description = "Internal server error", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["users"],
    operation_id = "updateUser"
)]
#[put("/users/{id}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<UserBody>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id = parse_id(&path)?;
    let draft = UserDraft::try_from(payload.into_inner()).map_err(map_validation_error)?;
    state.users_command.update_user(&id, draft).await?;
    Ok(web::Json(MessageResponse::new(USER_UPDATED)))
}

/// Delete a user.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = String, Path, description = "24-character hex identifier")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = Error),
        (status = 500, description = "Internal server error", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["users"],
    operation_id = "deleteUser"
)]
#[delete("/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<MessageResponse>> {
    let id = parse_id(&path)?;
    state.users_command.delete_user(&id).await?;
    Ok(web::Json(MessageResponse::new(USER_DELETED)))
}
