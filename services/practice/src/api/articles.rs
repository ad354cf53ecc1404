//! Blog article handlers. Reads are public; writes need an admin token.
use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, Caller};
use crate::api::types::MessageResponse;
use crate::app::AppState;
use crate::model::{Article, ArticleFields};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

#[utoipa::path(
    get,
    path = "/blog/articles",
    tag = "articles",
    responses(
        (status = 200, description = "All articles, newest first", body = [Article])
    )
)]
pub async fn list_articles(State(state): State<AppState>) -> Result<Json<Vec<Article>>, ApiError> {
    Ok(Json(state.articles.list_articles().await?))
}

#[utoipa::path(
    get,
    path = "/blog/articles/{article_id}",
    tag = "articles",
    params(("article_id" = String, Path, description = "Article identifier")),
    responses(
        (status = 200, description = "Article", body = Article),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_article(
    Path(article_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.articles.get_article(&article_id).await?))
}

#[utoipa::path(
    post,
    path = "/blog/articles",
    tag = "articles",
    request_body = ArticleFields,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Article created", body = Article),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn create_article(
    Caller(identity): Caller,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ArticleFields>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let article = state.articles.create_article(Some(&identity), body).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

#[utoipa::path(
    put,
    path = "/blog/articles/{article_id}",
    tag = "articles",
    params(("article_id" = String, Path, description = "Article identifier")),
    request_body = ArticleFields,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Article updated", body = Article),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_article(
    Caller(identity): Caller,
    Path(article_id): Path<String>,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ArticleFields>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(
        state
            .articles
            .update_article(Some(&identity), &article_id, body)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/blog/articles/{article_id}",
    tag = "articles",
    params(("article_id" = String, Path, description = "Article identifier")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Article deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_article(
    Caller(identity): Caller,
    Path(article_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .articles
        .delete_article(Some(&identity), &article_id)
        .await?;
    Ok(Json(MessageResponse {
        message: "article deleted".to_string(),
    }))
}
