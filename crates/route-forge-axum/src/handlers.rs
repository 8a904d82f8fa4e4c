//! Request pipeline shared by every generated model route.
//!
//! Order: header rules, authorization, path params, query, body (under the
//! route's payload timeout), payload schema, store call, content
//! negotiation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use route_forge_backend::{Criteria, UpdateMode};
use route_forge_core::schema::Violation;
use route_forge_core::types::{ModelDescriptor, Verb};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::guard;
use crate::route::RouteConfig;
use crate::state::ForgeState;

/// Body limit for JSON payloads.
pub const JSON_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Multipart part carrying the uploaded file.
pub const UPLOAD_PART: &str = "file";

/// Everything a handler needs to know about the route it serves.
#[derive(Debug)]
pub struct RouteContext {
    pub model: Arc<ModelDescriptor>,
    pub verb: Verb,
    pub config: RouteConfig,
}

enum Outcome {
    Body(StatusCode, Value),
    NoContent,
}

pub async fn handle(
    state: ForgeState,
    ctx: Arc<RouteContext>,
    id: Option<String>,
    request: Request,
) -> Response {
    let accept = request
        .headers()
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let method = request.method().clone();
    let uri = request.uri().clone();

    match process(&state, &ctx, id, request).await {
        Ok(outcome) => render(&state, &ctx.model, accept.as_deref(), outcome),
        Err(err) => {
            tracing::debug!(
                %method,
                %uri,
                model = %ctx.model.name(),
                status = err.status_code().as_u16(),
                error = %err,
                "request rejected"
            );
            err.into_response()
        }
    }
}

async fn process(
    state: &ForgeState,
    ctx: &RouteContext,
    id: Option<String>,
    request: Request,
) -> Result<Outcome, ApiError> {
    let validation = &ctx.config.validation;
    validation
        .headers
        .check(request.headers())
        .map_err(|details| ApiError::InvalidHeaders { details })?;
    guard::authorize(&ctx.config.auth, request.extensions())?;

    if let Some(params) = &validation.params {
        let mut object = Map::new();
        if let Some(id) = &id {
            object.insert("id".into(), Value::String(id.clone()));
        }
        params
            .validate(&Value::Object(object))
            .map_err(violations)?;
    }

    let criteria = parse_query(request.uri().query())?;
    let model = ctx.model.name();
    let store = &state.store;

    match ctx.verb {
        Verb::Get => match id {
            Some(id) => {
                let record = store.find_one(model, &id).await?;
                Ok(Outcome::Body(StatusCode::OK, record.to_json()))
            }
            None => {
                let result = store.find(model, &criteria).await?;
                let list = result.records.iter().map(|r| r.to_json()).collect();
                Ok(Outcome::Body(StatusCode::OK, Value::Array(list)))
            }
        },
        Verb::Post => {
            let fields = read_payload(ctx, request).await?;
            let record = store.create(model, fields).await?;
            tracing::info!(model = %model, id = %record.id, "record created");
            Ok(Outcome::Body(StatusCode::CREATED, record.to_json()))
        }
        Verb::Put => {
            let id = require_id(id)?;
            let fields = read_payload(ctx, request).await?;
            let (record, created) = store.upsert(model, &id, fields).await?;
            tracing::info!(model = %model, id = %record.id, created, "record replaced");
            Ok(Outcome::Body(StatusCode::ACCEPTED, record.to_json()))
        }
        Verb::Patch => {
            let id = require_id(id)?;
            let fields = read_payload(ctx, request).await?;
            let record = store.update(model, &id, fields, UpdateMode::Merge).await?;
            Ok(Outcome::Body(StatusCode::ACCEPTED, record.to_json()))
        }
        Verb::Delete => {
            let id = require_id(id)?;
            store.destroy(model, &id).await?;
            tracing::info!(model = %model, id = %id, "record deleted");
            Ok(Outcome::NoContent)
        }
        Verb::Upload => {
            let id = require_id(id)?;
            let record = upload(state, ctx, &id, request).await?;
            Ok(Outcome::Body(StatusCode::ACCEPTED, record))
        }
    }
}

fn render(
    state: &ForgeState,
    model: &ModelDescriptor,
    accept: Option<&str>,
    outcome: Outcome,
) -> Response {
    let (status, body) = match outcome {
        Outcome::NoContent => return StatusCode::NO_CONTENT.into_response(),
        Outcome::Body(status, body) => (status, body),
    };
    let (body, content_type) = match state.validators.negotiate(accept) {
        Some(validator) => (
            validator.decorate(model, body),
            validator.content_type().to_string(),
        ),
        None => (body, "application/json".to_string()),
    };
    match serde_json::to_vec(&body) {
        Ok(bytes) => (status, [(CONTENT_TYPE, content_type)], bytes).into_response(),
        Err(e) => ApiError::Internal {
            message: e.to_string(),
        }
        .into_response(),
    }
}

fn violations(list: Vec<Violation>) -> ApiError {
    ApiError::ValidationFailed {
        details: list.iter().map(ToString::to_string).collect(),
    }
}

fn require_id(id: Option<String>) -> Result<String, ApiError> {
    id.ok_or_else(|| ApiError::ValidationFailed {
        details: vec!["\"id\" is required".into()],
    })
}

/// `limit` and `skip` page the result; every other pair filters on a field.
fn parse_query(query: Option<&str>) -> Result<Criteria, ApiError> {
    let mut criteria = Criteria::new();
    let Some(query) = query else {
        return Ok(criteria);
    };
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "limit" => criteria = criteria.with_limit(parse_count("limit", &value)?),
            "skip" => criteria = criteria.with_skip(parse_count("skip", &value)?),
            _ => criteria = criteria.with_filter(key.into_owned(), Value::String(value.into_owned())),
        }
    }
    Ok(criteria)
}

fn parse_count(name: &str, value: &str) -> Result<usize, ApiError> {
    value.parse().map_err(|_| ApiError::InvalidQuery {
        message: format!("'{name}' must be a non-negative integer, got '{value}'"),
    })
}

async fn with_deadline<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| ApiError::RequestTimeout { timeout })?,
        None => fut.await,
    }
}

/// Reads and validates a JSON object body. An empty body reads as `{}`.
async fn read_payload(ctx: &RouteContext, request: Request) -> Result<Map<String, Value>, ApiError> {
    let limit = ctx.config.max_body_bytes.unwrap_or(JSON_BODY_LIMIT);
    let bytes = with_deadline(ctx.config.payload_timeout, read_body(request.into_body(), limit)).await?;

    let payload: Value = if bytes.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        serde_json::from_slice(&bytes).map_err(|e| ApiError::ValidationFailed {
            details: vec![format!("invalid JSON body: {e}")],
        })?
    };

    if let Some(schema) = &ctx.config.validation.payload {
        schema.validate(&payload).map_err(violations)?;
    }
    match payload {
        Value::Object(fields) => Ok(fields),
        _ => Err(ApiError::ValidationFailed {
            details: vec!["value must be an object".into()],
        }),
    }
}

async fn read_body(body: Body, limit: usize) -> Result<bytes::Bytes, ApiError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if e.into_inner().is::<http_body_util::LengthLimitError>() {
            ApiError::PayloadTooLarge { limit }
        } else {
            ApiError::ValidationFailed {
                details: vec!["request body could not be read".into()],
            }
        }
    })
}

/// Stores the [`UPLOAD_PART`] of a multipart body and records its location
/// under the model's upload field.
async fn upload(
    state: &ForgeState,
    ctx: &RouteContext,
    id: &str,
    request: Request,
) -> Result<Value, ApiError> {
    let model = ctx.model.name();
    let field = ctx
        .model
        .upload()
        .field()
        .ok_or_else(|| ApiError::Internal {
            message: format!("model '{model}' does not accept uploads"),
        })?
        .as_str()
        .to_owned();
    let storage = state.storage.as_ref().ok_or_else(|| ApiError::Internal {
        message: "no file storage configured".into(),
    })?;

    state.store.find_one(model, id).await?;

    let limit = ctx.config.max_body_bytes.unwrap_or(JSON_BODY_LIMIT);
    let (file_name, bytes) =
        with_deadline(ctx.config.payload_timeout, read_file_part(request, UPLOAD_PART, limit)).await?;

    let staged = tempfile::NamedTempFile::new().map_err(|e| ApiError::Internal {
        message: format!("failed to stage upload: {e}"),
    })?;
    tokio::fs::write(staged.path(), &bytes)
        .await
        .map_err(|e| ApiError::Internal {
            message: format!("failed to stage upload: {e}"),
        })?;
    let location = storage.upload(staged.path(), &file_name).await?;

    let mut fields = Map::new();
    fields.insert(field, Value::String(location.clone()));
    let record = state
        .store
        .update(model, id, fields, UpdateMode::Merge)
        .await?;
    tracing::info!(model = %model, id, location = %location, size = bytes.len(), "file uploaded");
    Ok(record.to_json())
}

async fn read_file_part(
    request: Request,
    part_name: &str,
    limit: usize,
) -> Result<(String, bytes::Bytes), ApiError> {
    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge { limit }
        } else {
            ApiError::ValidationFailed {
                details: vec![e.body_text()],
            }
        }
    };

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::ValidationFailed {
            details: vec![e.body_text()],
        })?;
    while let Some(part) = multipart.next_field().await.map_err(multipart_error)? {
        if part.name() != Some(part_name) {
            continue;
        }
        let file_name = part.file_name().unwrap_or(part_name).to_owned();
        let bytes = part.bytes().await.map_err(multipart_error)?;
        return Ok((file_name, bytes));
    }
    Err(ApiError::ValidationFailed {
        details: vec![format!("\"{part_name}\" is required")],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_splits_paging_from_filters() {
        let criteria = parse_query(Some("limit=5&skip=2&name=a%20b")).unwrap();
        assert_eq!(criteria.limit, Some(5));
        assert_eq!(criteria.skip, 2);
        assert_eq!(criteria.filter["name"], Value::from("a b"));
    }

    #[test]
    fn bad_limit_is_invalid_query() {
        let err = parse_query(Some("limit=-1")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidQuery { .. }));
    }

    #[test]
    fn absent_query_is_unfiltered() {
        let criteria = parse_query(None).unwrap();
        assert!(criteria.filter.is_empty());
        assert_eq!(criteria.limit, None);
    }

    #[test]
    fn missing_id_is_validation_error() {
        assert!(matches!(
            require_id(None),
            Err(ApiError::ValidationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn deadline_expiry_is_timeout() {
        let err = with_deadline(Some(Duration::from_millis(5)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ApiError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::RequestTimeout { .. }));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let err = read_body(Body::from(vec![b'x'; 64]), 8).await.unwrap_err();
        assert_eq!(err, ApiError::PayloadTooLarge { limit: 8 });
    }
}
