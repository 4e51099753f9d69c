//! Handlers for `/api/admin/*`.
//!
//! Every collection answers the same four verbs on one path:
//!
//! ```text
//! GET    ?search=&<filter>=&page=|skip=&limit=   list, or ?id= for one record
//! POST   {record}                                create
//! PUT    {_id | id, ...fields} or ?id=           update
//! DELETE ?id=                                    delete
//! ```
//!
//! Content collections share generic handlers whose state is the
//! collection's own [`ContentService`].

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, MethodRouter};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::store::content::ContentService;
use crate::store::models::ContentRecord;
use crate::store::users::{NewUser, UserUpdate, UserView, User};
use crate::store::{ListQuery, Record};

use super::response::{self, ApiJson};
use super::AppState;

type Params = HashMap<String, String>;

fn query_id(params: &Params) -> Option<&str> {
    params.get("id").map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn require_id(params: &Params) -> Result<String, AppError> {
    query_id(params)
        .map(str::to_string)
        .ok_or_else(|| AppError::validation("id is required"))
}

/// Id for a PUT: body `_id` or `id`, else `?id=`.
fn update_id(body: &Value, params: &Params) -> Result<String, AppError> {
    ["_id", "id"]
        .iter()
        .filter_map(|k| body.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .map_or_else(|| require_id(params), Ok)
}

// ── Content collections ───────────────────────────────────────────────────────

/// All four verbs for one content collection, bound to its service.
pub(super) fn content_routes<T, S>(service: ContentService<T>) -> MethodRouter<S>
where
    T: ContentRecord + Serialize,
    S: Clone + Send + Sync + 'static,
{
    get(list_content::<T>)
        .post(create_content::<T>)
        .put(update_content::<T>)
        .delete(delete_content::<T>)
        .with_state(service)
}

async fn list_content<T: ContentRecord>(
    State(svc): State<ContentService<T>>,
    Query(params): Query<Params>,
) -> Result<Json<Value>, AppError> {
    if let Some(id) = query_id(&params) {
        return Ok(response::data(svc.get(id).await?));
    }
    let query = ListQuery::from_params(&params, T::FILTER_FIELDS)?;
    Ok(response::page(svc.list(&query).await?))
}

async fn create_content<T: ContentRecord>(
    State(svc): State<ContentService<T>>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    Ok(response::created(svc.create_from_json(body).await?))
}

async fn update_content<T: ContentRecord>(
    State(svc): State<ContentService<T>>,
    Query(params): Query<Params>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Value>, AppError> {
    let id = update_id(&body, &params)?;
    Ok(response::data(svc.update_from_json(&id, body).await?))
}

async fn delete_content<T: ContentRecord>(
    State(svc): State<ContentService<T>>,
    Query(params): Query<Params>,
) -> Result<Json<Value>, AppError> {
    svc.delete(&require_id(&params)?).await?;
    Ok(response::ok())
}

/// GET /api/admin/topic-vault/stats
pub(super) async fn topic_vault_stats(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    Ok(response::data(state.topic_vault.stats().await?))
}

// ── Users ─────────────────────────────────────────────────────────────────────

/// GET /api/admin/users
pub(super) async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<Value>, AppError> {
    if let Some(id) = query_id(&params) {
        return Ok(response::data(UserView::from(state.users.get(id).await?)));
    }
    let query = ListQuery::from_params(&params, User::FILTER_FIELDS)?;
    Ok(response::page(state.users.list(&query).await?.map(UserView::from)))
}

/// POST /api/admin/users
pub(super) async fn create_user(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewUser>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user = state.users.create(new).await?;
    Ok(response::created(UserView::from(user)))
}

/// PUT /api/admin/users
pub(super) async fn update_user(
    State(state): State<AppState>,
    Query(params): Query<Params>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Value>, AppError> {
    let id = update_id(&body, &params)?;
    let update: UserUpdate =
        serde_json::from_value(body).map_err(|e| AppError::validation(format!("invalid user update: {e}")))?;
    Ok(response::data(UserView::from(state.users.update(&id, update).await?)))
}

/// DELETE /api/admin/users?id=
pub(super) async fn delete_user(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Json<Value>, AppError> {
    state.users.delete(&require_id(&params)?).await?;
    Ok(response::ok())
}

/// GET /api/admin/users/stats
pub(super) async fn user_stats(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    Ok(response::data(json!({
        "total": state.users.count_all().await?,
        "byRole": state.users.count_by_role().await?,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn update_id_prefers_body_then_query() {
        let p = params(&[("id", "from-query")]);
        assert_eq!(update_id(&json!({ "_id": "from-body" }), &p).unwrap(), "from-body");
        assert_eq!(update_id(&json!({ "id": "plain" }), &p).unwrap(), "plain");
        assert_eq!(update_id(&json!({ "_id": " " }), &p).unwrap(), "from-query");
        assert!(update_id(&json!({}), &params(&[])).is_err());
    }
}
