use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use persistence::{DigestSort, StoreError};
use scheduler_core::{Scheduler, SchedulerError};
use scheduler_types::messages::{AbortJobRequest, NewJobRequest};
use scheduler_types::{JobContext, JobDigest, JobId, JobLogEntry, SystemLogEntry};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
}

/// Page size is capped here rather than trusted from the query string, since
/// an unbounded `pageSize` would let a single request walk the whole table.
const MAX_PAGE_SIZE: i64 = 500;

fn parse_job_id(raw: &str) -> Result<JobId, StatusCode> {
    JobId::from_str(raw).map_err(|_| StatusCode::BAD_REQUEST)
}

fn capped_page_size(requested: i64) -> i64 {
    requested.clamp(1, MAX_PAGE_SIZE)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page: Vec<T>,
    pub page_size: i64,
    pub offset_next_page: i64,
    pub total: i64,
}

fn paginate<T>(items: Vec<T>, skip: i64, page_size: i64, total: i64) -> Page<T> {
    Page {
        page: items,
        page_size,
        offset_next_page: skip + page_size,
        total,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page_size() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    ModifiedTime,
    CreatedTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsQuery {
    #[serde(default = "default_sort_by")]
    pub sort_by: SortBy,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_sort_by() -> SortBy {
    SortBy::ModifiedTime
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Page<JobDigest>>, StatusCode> {
    let page_size = capped_page_size(query.page_size);
    let sort = match query.sort_by {
        SortBy::ModifiedTime => DigestSort::ModifiedTime,
        SortBy::CreatedTime => DigestSort::CreatedTime,
    };
    let store = state.scheduler.store();
    let digests = store
        .list_digests(sort, query.skip, page_size)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let total = store.count_digests().await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(paginate(digests, query.skip, page_size, total)))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobContext>, StatusCode> {
    let job_id = parse_job_id(&job_id)?;
    let context = state
        .scheduler
        .store()
        .get_job(job_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(context))
}

#[derive(Debug, Serialize)]
pub struct NewJobResponse {
    pub job_id: JobId,
}

pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<NewJobRequest>,
) -> Result<Json<NewJobResponse>, StatusCode> {
    if request.job_workers.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let job_id = state
        .scheduler
        .new_job(&request)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(NewJobResponse { job_id }))
}

pub async fn abort_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let job_id = parse_job_id(&job_id)?;
    state
        .scheduler
        .abort_job(&AbortJobRequest { job_id })
        .await
        .map_err(|err| match err {
            SchedulerError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        })?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct RestartQuery {
    #[serde(default = "default_restart_from", rename = "restartFrom")]
    pub restart_from: i32,
}

fn default_restart_from() -> i32 {
    -1
}

pub async fn restart_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<RestartQuery>,
) -> Result<StatusCode, StatusCode> {
    let job_id = parse_job_id(&job_id)?;
    state
        .scheduler
        .restart_job(job_id, query.restart_from)
        .await
        .map_err(|err| match err {
            SchedulerError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            SchedulerError::Store(StoreError::Conflict(_)) => StatusCode::BAD_REQUEST,
            SchedulerError::Store(StoreError::StageOutOfRange(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn job_log(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<JobLogEntry>>, StatusCode> {
    let job_id = parse_job_id(&job_id)?;
    let page_size = capped_page_size(page.page_size);
    let store = state.scheduler.store();
    let entries = store
        .job_logs(job_id, page.skip, page_size)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let total = store
        .count_job_logs(job_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(paginate(entries, page.skip, page_size, total)))
}

pub async fn get_tags(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<HashMap<String, String>>, StatusCode> {
    let job_id = parse_job_id(&job_id)?;
    let context = state
        .scheduler
        .store()
        .get_job(job_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(context.tags))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Path((job_id, key)): Path<(String, String)>,
) -> Result<Json<String>, StatusCode> {
    let job_id = parse_job_id(&job_id)?;
    let value = state
        .scheduler
        .store()
        .get_tag(job_id, &key)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(value))
}

#[derive(Debug, Deserialize)]
pub struct SetTagQuery {
    #[serde(rename = "tagValue")]
    pub tag_value: String,
}

pub async fn set_tag(
    State(state): State<AppState>,
    Path((job_id, key)): Path<(String, String)>,
    Query(query): Query<SetTagQuery>,
) -> Result<StatusCode, StatusCode> {
    let job_id = parse_job_id(&job_id)?;
    state
        .scheduler
        .store()
        .set_tag(job_id, &key, &query.tag_value)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path((job_id, key)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    let job_id = parse_job_id(&job_id)?;
    state
        .scheduler
        .store()
        .delete_tag(job_id, &key)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tag_keys(State(state): State<AppState>) -> Result<Json<Vec<String>>, StatusCode> {
    let keys = state
        .scheduler
        .store()
        .list_tag_keys()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(keys))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub tag_key: String,
    pub tag_value: String,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

pub async fn search_by_tag(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Page<JobId>>, StatusCode> {
    let page_size = capped_page_size(query.page_size);
    let store = state.scheduler.store();
    let job_ids = store
        .search_by_tag(&query.tag_key, &query.tag_value, query.skip, page_size)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let total = store
        .count_tag_matches(&query.tag_key, &query.tag_value)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(paginate(job_ids, query.skip, page_size, total)))
}

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub service: &'static str,
    pub version: &'static str,
}

pub async fn system_info() -> Json<SystemInfo> {
    Json(SystemInfo {
        service: "scheduler-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DisplayPage {
    SystemLog(Page<SystemLogEntry>),
    JobLog(Page<JobLogEntry>),
}

/// `kind` is either `systemLog` or `jobLog`; anything else is a 404, since
/// neither display exists under that name.
pub async fn system_display(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<DisplayPage>, StatusCode> {
    let page_size = capped_page_size(page.page_size);
    let store = state.scheduler.store();
    match kind.as_str() {
        "systemLog" => {
            let entries = store
                .system_logs(page.skip, page_size)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            let total = store.count_system_logs().await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            Ok(Json(DisplayPage::SystemLog(paginate(entries, page.skip, page_size, total))))
        }
        "jobLog" => {
            let entries = store
                .all_job_logs(page.skip, page_size)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            let total = store
                .count_all_job_logs()
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            Ok(Json(DisplayPage::JobLog(paginate(entries, page.skip, page_size, total))))
        }
        _ => Err(StatusCode::NOT_FOUND),
    }
}
