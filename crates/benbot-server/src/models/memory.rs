use serde::Serialize;
use std::collections::BTreeMap;

use crate::services::conversation::{Fact, MemorySummary, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryState {
    Active,
    Inactive,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStatusResponse {
    pub memory: MemoryState,
    pub summary: Option<MemorySummary>,
    pub user_info: BTreeMap<String, Fact>,
    pub topics: Vec<String>,
    pub recent_messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct MemoryClearResponse {
    pub success: bool,
    pub message: String,
}
