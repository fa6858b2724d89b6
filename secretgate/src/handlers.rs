//! HTTP handlers for the secrets API
//!
//! Handlers parse request bodies themselves and translate manager results
//! into status codes: reads map a failure to 404, mutations to 403, and
//! input validation fails with 400 before the manager is invoked.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use secretgate_manager::Secret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::router::AppState;

/// Static API description served at `/api-docs`.
const API_DOCS: &str = include_str!("../api-docs.json");

#[derive(Debug, Deserialize)]
struct CreateSecretRequest {
    name: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateSecretRequest {
    value: Option<String>,
}

pub async fn health() -> Response {
    json_body(StatusCode::OK, r#"{"status": "running"}"#.to_string())
}

pub async fn api_docs() -> Response {
    json_body(StatusCode::OK, API_DOCS.to_string())
}

pub async fn list_secrets(State(state): State<Arc<AppState>>) -> Response {
    match state.manager.list().await {
        Ok(resolved) => {
            let secrets: Vec<Option<Secret>> = resolved
                .into_iter()
                .map(|entry| match entry {
                    Ok(secret) => Some(secret),
                    // A secret that failed to resolve stays in the list as
                    // a hole, but its failure still gets an error record
                    Err(err) => {
                        state.report("list secrets", &err);
                        None
                    }
                })
                .collect();
            json_response(StatusCode::OK, &secrets)
        }
        Err(err) => {
            state.report("list secrets", &err);
            message_response(
                StatusCode::FORBIDDEN,
                "Unable to retrieve secrets from project.",
            )
        }
    }
}

pub async fn create_secret(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: CreateSecretRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => return message_response(StatusCode::BAD_REQUEST, "Invalid secret input."),
    };
    let (Some(name), Some(value)) = (request.name, request.value) else {
        return message_response(StatusCode::BAD_REQUEST, "Invalid secret input.");
    };
    if name.is_empty() || value.is_empty() {
        return message_response(StatusCode::BAD_REQUEST, "Invalid secret input.");
    }

    match state.manager.create(&name, &value).await {
        Ok(secret) => json_response(StatusCode::CREATED, &secret),
        Err(err) => {
            state.report("create secret", &err);
            message_response(StatusCode::FORBIDDEN, "Unable to create secret in project.")
        }
    }
}

pub async fn get_secret(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    if name.is_empty() {
        return message_response(StatusCode::BAD_REQUEST, "Secret name is required.");
    }

    match state.manager.get(&name).await {
        Ok(secret) => json_response(StatusCode::OK, &secret),
        // Reads do not leak backend state; every failure reads as absence
        Err(err) => {
            state.report("get secret", &err);
            message_response(StatusCode::NOT_FOUND, "Secret not found.")
        }
    }
}

pub async fn update_secret(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    if name.is_empty() {
        return message_response(StatusCode::BAD_REQUEST, "Secret name is required.");
    }
    let value = serde_json::from_slice::<UpdateSecretRequest>(&body)
        .ok()
        .and_then(|request| request.value)
        .filter(|value| !value.is_empty());
    let Some(value) = value else {
        return message_response(StatusCode::BAD_REQUEST, "Invalid secret value.");
    };

    match state.manager.update(&name, &value).await {
        Ok(secret) => json_response(StatusCode::OK, &secret),
        Err(err) => {
            state.report("update secret", &err);
            message_response(StatusCode::FORBIDDEN, "Unable to update secret in project.")
        }
    }
}

pub async fn delete_secret(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    if name.is_empty() {
        return message_response(StatusCode::BAD_REQUEST, "Secret name is required.");
    }

    match state.manager.delete(&name).await {
        Ok(()) => Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(Body::empty())
            .unwrap(),
        Err(err) => {
            state.report("delete secret", &err);
            message_response(StatusCode::FORBIDDEN, "Unable to delete secret in project.")
        }
    }
}

// === Helpers ===

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    json_body(status, serde_json::to_string(body).unwrap_or_default())
}

fn message_response(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "message": message });
    json_body(status, body.to_string())
}

fn json_body(status: StatusCode, body: String) -> Response {
    // Set the length here so the access log can record body bytes; hyper
    // only adds the header when writing to the wire
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}
