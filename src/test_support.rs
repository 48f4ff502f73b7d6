use std::sync::Arc;

use axum::{
    body::to_bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    auth::gate::Actor,
    error::AppError,
    store::{memory::MemoryStore, DynStore},
};

pub fn memory_store() -> DynStore {
    Arc::new(MemoryStore::new())
}

pub fn actor() -> Actor {
    Actor {
        user_id: 1,
        token_id: Uuid::new_v4(),
    }
}

pub async fn body_of(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Render either arm of a handler result the way axum would.
pub async fn respond<T: IntoResponse>(
    result: Result<T, AppError>,
) -> (StatusCode, Value) {
    let response = match result {
        Ok(ok) => ok.into_response(),
        Err(err) => err.into_response(),
    };
    body_of(response).await
}

pub fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}
