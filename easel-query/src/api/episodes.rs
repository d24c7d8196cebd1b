//! Episode filter endpoint

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use tracing::info;

use crate::db::find_episodes;
use crate::error::ApiResult;
use crate::filter::{FilterCriteria, FilterRequest};
use crate::model::EpisodeView;
use crate::AppState;

/// GET /episodes?months=&tags=&materials=&mode=
///
/// The request is validated before the database is touched. A query string
/// that does not deserialize (repeated parameter, name given with its alias)
/// is a bad request like any other.
pub async fn get_episodes(
    State(state): State<AppState>,
    query: Result<Query<FilterRequest>, QueryRejection>,
) -> ApiResult<Json<Vec<EpisodeView>>> {
    let Query(request) = query?;
    let criteria = FilterCriteria::from_request(&request)?;
    let plan = criteria.plan();

    let episodes = find_episodes(&state.db, &plan).await?;

    info!(
        months = criteria.months.len(),
        tags = criteria.tags.len(),
        materials = criteria.materials.len(),
        mode = ?criteria.mode,
        matched = episodes.len(),
        "Episode filter"
    );

    Ok(Json(episodes))
}
