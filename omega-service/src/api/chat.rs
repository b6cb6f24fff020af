//! Chat endpoint.
//!
//! Accepts `message` and `history` form fields, url-encoded or multipart,
//! and returns the QA chain's answer.

use axum::{
    Form, Json,
    extract::{FromRequest, Multipart, Request, State},
    http::header,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::history::parse_history;

use super::AppState;

/// Raw chat form fields, history still JSON-encoded
#[derive(Debug, Default, Deserialize)]
pub struct ChatForm {
    pub message: Option<String>,
    pub history: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

impl<S> FromRequest<S> for ChatForm
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(&req) {
            let multipart = Multipart::from_request(req, state).await.map_err(|e| {
                ServiceError::InvalidRequest {
                    message: e.body_text(),
                }
            })?;
            read_multipart(multipart).await
        } else {
            let Form(form) = Form::<ChatForm>::from_request(req, state)
                .await
                .map_err(|e| ServiceError::InvalidRequest {
                    message: e.body_text(),
                })?;
            Ok(form)
        }
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok())
        .is_some_and(|m| m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA)
}

async fn read_multipart(mut multipart: Multipart) -> ServiceResult<ChatForm> {
    let mut form = ChatForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::InvalidRequest {
            message: e.body_text(),
        })?
    {
        let slot = match field.name() {
            Some("message") => &mut form.message,
            Some("history") => &mut form.history,
            _ => continue,
        };
        *slot = Some(field.text().await.map_err(|e| ServiceError::InvalidRequest {
            message: e.body_text(),
        })?);
    }

    Ok(form)
}

/// Answer `message` in the context of the supplied history
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    form: ChatForm,
) -> ServiceResult<Json<ChatResponse>> {
    metrics::counter!("omega_chat_requests_total").increment(1);

    let result = answer(&state, form).await;
    if result.is_err() {
        metrics::counter!("omega_chat_failures_total").increment(1);
    }
    result.map(|response| Json(ChatResponse { response }))
}

async fn answer(state: &AppState, form: ChatForm) -> ServiceResult<String> {
    let message = form.message.ok_or_else(|| ServiceError::InvalidRequest {
        message: "Missing form field: message".to_string(),
    })?;
    let history = parse_history(form.history.as_deref().unwrap_or_default())?;

    info!(history_len = history.len(), "Chat request");

    state.chain.query(&message, &history).await
}
