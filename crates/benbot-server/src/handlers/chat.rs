use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::handlers::session::ClientSession;
use crate::models::chat::{ChatRequest, ChatResponse};
use crate::services::conversation::{Role, SessionId};
use crate::services::llm::{render_transcript, GenerationParams, FALLBACK_REPLY};
use crate::state::AppState;
use crate::utils::error::{ApiError, LlmFailureKind};

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    mut session: ClientSession,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<(ClientSession, Json<ChatResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;

    let starts_record = !state.memory.session(&session.id).is_active();
    let response = converse(&state, &session.id, request).await?;

    // A new record lives a full TTL from now; the cookie must too
    if starts_record {
        session.reissue(&state.session_cookie)?;
    }
    Ok((session, Json(response)))
}

/// One chat turn: remember the user message, ask the model with the recent
/// context, remember the reply. Model failures answer with the fallback reply.
pub async fn converse(
    state: &AppState,
    session: &SessionId,
    request: ChatRequest,
) -> Result<ChatResponse, ApiError> {
    let start_time = Instant::now();

    let message = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Message is empty".to_string()))?
        .to_string();

    let llm_config = &state.settings.llm;
    let params = GenerationParams {
        temperature: request
            .temperature
            .unwrap_or(llm_config.temperature)
            .clamp(0.0, 2.0),
        max_tokens: request
            .max_tokens
            .unwrap_or(llm_config.max_tokens)
            .min(llm_config.max_tokens_limit),
        ..GenerationParams::from_config(llm_config)
    };

    let memory = state.memory.session(session);
    memory.add_message(Role::User, message.as_str());
    memory.observe_user_message(&message);

    let context = memory.get_context(state.memory.config().context_window);
    let prompt = render_transcript(&context);

    info!(
        "Chat request: session={}, message_len={}, context={}, max_tokens={}",
        session,
        message.len(),
        context.len(),
        params.max_tokens
    );

    let (success, response, model, error) = match state.llm.generate(&prompt, &params).await {
        Ok(completion) => {
            memory.add_message(Role::Assistant, completion.text.as_str());
            info!(
                "Chat completed: session={}, model={}, tokens~{}, took {:?}",
                session,
                completion.model,
                completion.tokens_used,
                start_time.elapsed()
            );
            (true, completion.text, completion.model, None)
        }
        Err(e) => {
            let kind = LlmFailureKind::classify(&e.to_string());
            warn!("Model call failed ({}): {}", kind.as_str(), e);
            (
                false,
                FALLBACK_REPLY.to_string(),
                state.llm.model_name(),
                Some(kind.as_str().to_string()),
            )
        }
    };

    Ok(ChatResponse {
        success,
        response,
        model,
        memory: memory.status(),
        error,
        timestamp: state.clock.now(),
    })
}
