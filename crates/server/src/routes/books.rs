use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use service::books::{Book, BookPayload, BookStats};
use service::errors::FieldError;

use crate::errors::ApiError;
use crate::startup::ServerState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

/// 列出所有图书
pub async fn list_books(State(state): State<ServerState>) -> Result<Json<Vec<Book>>, ApiError> {
    state
        .books
        .list()
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(e, "Failed to load books"))
}

/// 创建图书
pub async fn create_book(
    State(state): State<ServerState>,
    Json(payload): Json<BookPayload>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = state
        .books
        .create(payload)
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to create book"))?;
    info!(id = %book.id, title = %book.title, "created book");
    Ok((StatusCode::CREATED, Json(book)))
}

/// 更新指定图书（缺失字段保留原值）
pub async fn update_book(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<BookPayload>,
) -> Result<Json<Book>, ApiError> {
    let book = state
        .books
        .update(&id, payload)
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to update book"))?;
    info!(id = %book.id, "updated book");
    Ok(Json(book))
}

/// 删除指定图书
pub async fn delete_book(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = state
        .books
        .delete(&id)
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to delete book"))?;
    info!(id = %removed.id, title = %removed.title, "deleted book");
    Ok(Json(serde_json::json!({
        "message": format!("Book '{}' deleted successfully", removed.title)
    })))
}

/// 检索：query 为必填参数；标题/作者忽略大小写，ISBN 为原样子串
pub async fn search_books(
    State(state): State<ServerState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let query = params.query.ok_or_else(|| {
        ApiError::validation(vec![FieldError::new("query", "query parameter is required")])
    })?;
    state
        .books
        .search(&query)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(e, "Failed to search books"))
}

/// 随机推荐最多 3 本
pub async fn recommendations(
    State(state): State<ServerState>,
) -> Result<Json<Vec<Book>>, ApiError> {
    state
        .books
        .recommendations()
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(e, "Failed to load recommendations"))
}

/// 汇总统计
pub async fn stats(State(state): State<ServerState>) -> Result<Json<BookStats>, ApiError> {
    state
        .books
        .stats()
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(e, "Failed to compute stats"))
}

/// 按十年区间筛选；路径参数必须是合法整数年代
pub async fn books_by_decade(
    State(state): State<ServerState>,
    Path(decade): Path<String>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let decade: i32 = decade.parse().map_err(|_| {
        ApiError::validation(vec![FieldError::new("decade", "decade must be an integer")])
    })?;
    state
        .books
        .by_decade(decade)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(e, "Failed to filter books by decade"))
}
