//! 控制接口（HTTP）
//!
//! 每个平台前缀挂一组相同的路由，处理函数只做参数转换，全部逻辑在 `PlatformService`

pub mod body;

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::error::{AppError, ErrorInfo, ErrorKind, PublishError};
use crate::orchestrator::{LoginResult, LoginStatus, LogoutResult, PlatformService, ProfileFeed};
use crate::workflow::PublishResult;

use body::{ClickBody, FeedQuery, GotoBody, ImagesBody, ProfileQuery, TypeBody, VideoBody};

type SharedService = Arc<PlatformService>;

/// 构建完整路由
///
/// # 参数
/// - `services`: 各平台服务，每个服务按其全部前缀挂载
pub fn router(services: &[SharedService]) -> Router {
    let mut app = Router::new().route("/api/health", get(health));
    for service in services {
        for prefix in service.config().platform.prefixes() {
            app = app.nest(&format!("/{}", prefix), platform_routes(service.clone()));
        }
    }
    app.layer(CorsLayer::permissive())
}

fn platform_routes(service: SharedService) -> Router {
    let mut routes = Router::new()
        .route("/manual-login", post(manual_login))
        .route("/check-status", get(check_status))
        .route("/publish", post(publish_video))
        .route("/publish-images", post(publish_images))
        .route("/logout", post(logout))
        .route("/remote-screenshot", get(remote_screenshot))
        .route("/remote-goto", post(remote_goto))
        .route("/remote-click", post(remote_click))
        .route("/remote-type", post(remote_type));
    if service.config().profile_feed.is_some() {
        routes = routes.route("/fetch-profile-html", get(fetch_profile_html));
    }
    routes.with_state(service)
}

// ========== 错误响应 ==========

/// 把 `AppError` 转成 JSON 错误响应
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::ValidationError | ErrorKind::ForbiddenContent => StatusCode::BAD_REQUEST,
            ErrorKind::SessionBusy | ErrorKind::NotInitialized => StatusCode::CONFLICT,
            _ if matches!(self.0, AppError::Publish(PublishError::Unsupported)) => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!("❌ 请求失败: {}", self.0);
        let info = ErrorInfo::from(&self.0);
        let body = json!({
            "success": false,
            "message": info.message,
            "error": info,
        });
        (status, Json(body)).into_response()
    }
}

// ========== 处理函数 ==========

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn manual_login(
    State(service): State<SharedService>,
    Query(query): Query<ProfileQuery>,
) -> Json<LoginResult> {
    Json(service.manual_login(query.profile.as_deref()).await)
}

async fn check_status(
    State(service): State<SharedService>,
    Query(query): Query<ProfileQuery>,
) -> Json<LoginStatus> {
    Json(service.check_login_status(query.profile.as_deref()).await)
}

async fn publish_video(
    State(service): State<SharedService>,
    Json(body): Json<VideoBody>,
) -> Json<PublishResult> {
    Json(service.publish_video(&body.into_request()).await)
}

async fn publish_images(
    State(service): State<SharedService>,
    Json(body): Json<ImagesBody>,
) -> Json<PublishResult> {
    Json(service.publish_images(&body.into_request()).await)
}

async fn logout(
    State(service): State<SharedService>,
    Query(query): Query<ProfileQuery>,
) -> Json<LogoutResult> {
    Json(service.logout(query.profile.as_deref()).await)
}

async fn fetch_profile_html(
    State(service): State<SharedService>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<ProfileFeed>, ApiError> {
    let feed = service
        .fetch_profile_html(&query.user_id, query.profile.as_deref())
        .await?;
    Ok(Json(feed))
}

async fn remote_screenshot(
    State(service): State<SharedService>,
    Query(query): Query<ProfileQuery>,
) -> Result<Response, ApiError> {
    let png = service.remote_screenshot(query.profile.as_deref()).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

async fn remote_goto(
    State(service): State<SharedService>,
    Json(body): Json<GotoBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let url = service
        .remote_goto(&body.url, body.profile.as_deref())
        .await?;
    Ok(Json(json!({ "success": true, "url": url })))
}

async fn remote_click(
    State(service): State<SharedService>,
    Json(body): Json<ClickBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service
        .remote_click(body.x, body.y, body.profile.as_deref())
        .await?;
    Ok(Json(json!({ "success": true })))
}

async fn remote_type(
    State(service): State<SharedService>,
    Json(body): Json<TypeBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    service
        .remote_type(&body.text, body.profile.as_deref())
        .await?;
    Ok(Json(json!({ "success": true })))
}
