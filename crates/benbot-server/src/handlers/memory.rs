use axum::{extract::State, Json};
use std::sync::Arc;

use crate::handlers::session::ClientSession;
use crate::models::memory::{MemoryClearResponse, MemoryState, MemoryStatusResponse};
use crate::state::AppState;

const RECENT_MESSAGES: usize = 5;

pub async fn memory_status(
    State(state): State<Arc<AppState>>,
    session: ClientSession,
) -> (ClientSession, Json<MemoryStatusResponse>) {
    let memory = state.memory.session(&session.id);

    let body = match memory.summary() {
        Some(summary) => MemoryStatusResponse {
            memory: MemoryState::Active,
            summary: Some(summary),
            user_info: memory.get_all_facts(),
            topics: memory.topics(),
            recent_messages: memory.get_context(RECENT_MESSAGES),
        },
        None => MemoryStatusResponse {
            memory: MemoryState::Inactive,
            summary: None,
            user_info: Default::default(),
            topics: Vec::new(),
            recent_messages: Vec::new(),
        },
    };

    (session, Json(body))
}

pub async fn memory_clear(
    State(state): State<Arc<AppState>>,
    session: ClientSession,
) -> (ClientSession, Json<MemoryClearResponse>) {
    state.memory.session(&session.id).clear();

    (
        session,
        Json(MemoryClearResponse {
            success: true,
            message: "Conversation memory cleared".to_string(),
        }),
    )
}
