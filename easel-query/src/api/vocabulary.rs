//! Vocabulary listings

use axum::{extract::State, Json};
use easel_common::db::list_vocabulary_names;
use easel_common::VocabularyKind;

use crate::error::ApiResult;
use crate::AppState;

/// GET /materials
pub async fn get_materials(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let names = list_vocabulary_names(&state.db, VocabularyKind::Material).await?;
    Ok(Json(names))
}

/// GET /tags
pub async fn get_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let names = list_vocabulary_names(&state.db, VocabularyKind::Tag).await?;
    Ok(Json(names))
}
