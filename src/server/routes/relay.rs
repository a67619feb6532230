//! Prompt → completion → contacts → email relays.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::non_empty;
use crate::error::ApiError;
use crate::mail::OutgoingEmail;
use crate::server::extract::ApiJson;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub prompt: Option<String>,
    #[serde(rename = "sendTo")]
    pub send_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub to: String,
    pub sent: bool,
    pub response: String,
}

/// Ask the model, look the recipient up in the contacts sheet, and mail them the reply.
pub async fn ask_liam(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let (Some(prompt), Some(send_to)) = (non_empty(req.prompt), non_empty(req.send_to)) else {
        return Err(ApiError::Validation("Missing prompt or sendTo".into()));
    };

    tracing::info!(prompt_len = prompt.len(), send_to = %send_to, "ask-liam called");

    let reply = state
        .chat
        .complete(&prompt)
        .await
        .map_err(|e| state.failure("ask-liam", e))?;

    let to = state
        .contacts
        .resolve_email(&send_to)
        .await
        .map_err(|e| state.failure("ask-liam", e))?
        .ok_or_else(|| {
            state.activity.error(format!("ask-liam: no contact named '{send_to}'"));
            ApiError::NotFound("Recipient not found in contacts sheet.".into())
        })?;

    state
        .mailer
        .send(OutgoingEmail {
            to: to.clone(),
            subject: state.config.mail.subject.clone(),
            body: reply.clone(),
        })
        .await
        .map_err(|e| state.failure("ask-liam", e))?;

    state.activity.info(format!("ask-liam: reply sent to {to}"));
    Ok(Json(AskResponse {
        to,
        sent: true,
        response: reply,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub response: String,
}

pub async fn prompt(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PromptRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    let prompt =
        non_empty(req.prompt).ok_or_else(|| ApiError::Validation("Missing prompt".into()))?;

    let response = state
        .chat
        .complete(&prompt)
        .await
        .map_err(|e| state.failure("prompt", e))?;

    state.activity.info(format!("prompt: {} chars answered", response.len()));
    Ok(Json(PromptResponse { response }))
}

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    #[serde(alias = "sendTo")]
    pub to: Option<String>,
    pub subject: Option<String>,
    #[serde(alias = "text")]
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub to: String,
    pub sent: bool,
}

/// Send a message to an address, or to a contact name resolved through the sheet.
pub async fn send_email(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SendEmailRequest>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let (Some(recipient), Some(body)) = (non_empty(req.to), non_empty(req.body)) else {
        return Err(ApiError::Validation("Missing to or body".into()));
    };

    let to = if recipient.contains('@') {
        recipient
    } else {
        state
            .contacts
            .resolve_email(&recipient)
            .await
            .map_err(|e| state.failure("send-email", e))?
            .ok_or_else(|| ApiError::NotFound("Recipient not found in contacts sheet.".into()))?
    };

    let subject = non_empty(req.subject).unwrap_or_else(|| state.config.mail.subject.clone());
    state
        .mailer
        .send(OutgoingEmail {
            to: to.clone(),
            subject,
            body,
        })
        .await
        .map_err(|e| state.failure("send-email", e))?;

    state.activity.info(format!("send-email: sent to {to}"));
    Ok(Json(SendEmailResponse { to, sent: true }))
}
