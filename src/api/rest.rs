//! REST API endpoints using Actix-Web

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::{IntervalStream, UnboundedReceiverStream};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::responses::{api_error, ApiResponse, ApiResult};
use crate::channel::{sse_frame, ChannelTable, RosterNotifier};
use crate::federation::SCOPE_HEADER;
use crate::models::{HubError, HubMessage, PeerMessage};
use crate::registry::PendingCallInfo;
use crate::services::{Hub, HubStats};

use super::health::configure_health_routes;

/// Shared application state
#[derive(Clone)]
pub struct ApiState {
    pub hub: Arc<Hub>,
    pub channels: ChannelTable,
    pub roster: RosterNotifier,
    pub scope: String,
    pub keep_alive: Duration,
}

impl ApiState {
    pub fn new(hub: Arc<Hub>, roster: RosterNotifier, scope: impl Into<String>, keep_alive: Duration) -> Self {
        Self {
            hub,
            channels: ChannelTable::new(),
            roster,
            scope: scope.into(),
            keep_alive,
        }
    }
}

/// Configure all REST API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Health endpoints at root
    configure_health_routes(cfg);

    // API v1 routes
    cfg.service(web::scope("/api/v1").configure(configure_v1_routes));
}

/// Configure API v1 routes
fn configure_v1_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Directory routes
        .route("/services", web::get().to(list_services))
        .route("/roster", web::get().to(get_roster))
        .route("/hub", web::get().to(get_hub_info))
        // Peer channel routes
        .route("/connect", web::get().to(connect))
        .service(
            web::scope("/channels")
                .route("/{channel_id}/messages", web::post().to(post_peer_message)),
        )
        // Federation routes
        .service(
            web::scope("/federation")
                .route("/messages", web::post().to(post_federation_message)),
        );
}

// ============================================================================
// Directory Handlers
// ============================================================================

async fn list_services(state: web::Data<ApiState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(state.hub.list_services()))
}

async fn get_roster(state: web::Data<ApiState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(state.roster.entries()))
}

#[derive(Debug, Serialize)]
pub struct HubInfo {
    pub hub_id: String,
    pub stats: HubStats,
    pub pending_calls: Vec<PendingCallInfo>,
}

async fn get_hub_info(state: web::Data<ApiState>) -> HttpResponse {
    let info = HubInfo {
        hub_id: state.hub.id().to_string(),
        stats: state.hub.stats(),
        pending_calls: state.hub.pending_calls(),
    };
    HttpResponse::Ok().json(ApiResponse::success(info))
}

// ============================================================================
// Peer Channel Handlers
// ============================================================================

/// Open a peer channel as an event stream.
///
/// The first event (`channel`) carries the id the peer posts against; every
/// later data event is one hub-to-peer message.
async fn connect(state: web::Data<ApiState>) -> HttpResponse {
    let (channel_id, rx) = state.channels.open();

    let hello = sse_frame(
        Some("channel"),
        &serde_json::json!({ "channelId": channel_id }).to_string(),
    );

    let messages = UnboundedReceiverStream::new(rx).map(|message| {
        match serde_json::to_string(&message) {
            Ok(data) => sse_frame(None, &data),
            Err(e) => {
                warn!("CHANNEL>> failed to encode {}: {}", message.kind(), e);
                String::new()
            }
        }
    });

    let keep_alive = IntervalStream::new(tokio::time::interval(state.keep_alive))
        .map(|_| ": keep-alive\n\n".to_string());

    let body = stream::once(async move { hello })
        .chain(stream::select(messages, keep_alive))
        .map(|frame| Ok::<_, actix_web::Error>(web::Bytes::from(frame)));

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(body)
}

async fn post_peer_message(
    state: web::Data<ApiState>,
    path: web::Path<Uuid>,
    req: HttpRequest,
    body: web::Json<serde_json::Value>,
) -> ApiResult<HttpResponse> {
    let channel_id = path.into_inner();
    let channel = state
        .channels
        .get(&channel_id)
        .ok_or_else(|| api_error(HubError::ChannelClosed(format!("unknown channel {}", channel_id))))?;

    let message: PeerMessage = serde_json::from_value(body.into_inner())
        .map_err(|e| api_error(HubError::from(e)))?;

    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("null");

    state.hub.handle_message(&channel, origin, message);

    Ok(HttpResponse::Accepted().finish())
}

// ============================================================================
// Federation Handlers
// ============================================================================

async fn post_federation_message(
    state: web::Data<ApiState>,
    req: HttpRequest,
    body: web::Json<serde_json::Value>,
) -> ApiResult<HttpResponse> {
    let scope = req
        .headers()
        .get(SCOPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if scope != state.scope {
        debug!("BROADCAST>> rejected message for scope '{}'", scope);
        return Err(api_error(HubError::FederationError(format!(
            "scope '{}' does not match",
            scope
        ))));
    }

    let message: HubMessage = serde_json::from_value(body.into_inner())
        .map_err(|e| api_error(HubError::from(e)))?;

    state.hub.handle_broadcast(message);

    Ok(HttpResponse::Accepted().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::NullBroadcast;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::json;

    fn setup_state() -> ApiState {
        let roster = RosterNotifier::new();
        let hub = Hub::new(Arc::new(NullBroadcast), Arc::new(roster.clone()));
        ApiState::new(hub, roster, "test-scope", Duration::from_secs(30))
    }

    #[actix_rt::test]
    async fn test_peer_message_flow() {
        let state = setup_state();
        let (channel_id, mut rx) = state.channels.open();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/channels/{}/messages", channel_id))
            .insert_header((header::ORIGIN, "https://a.example"))
            .set_json(json!({ "type": "ping", "services": ["search"] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        let Some(PeerMessage::Pong(pong)) = rx.recv().await else {
            panic!("expected pong");
        };

        let req = test::TestRequest::get().uri("/api/v1/services").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["frameId"], pong.frame_id.as_str());
        assert_eq!(body["data"][0]["origin"], "https://a.example");
    }

    #[actix_rt::test]
    async fn test_unknown_channel_is_gone() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(setup_state()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/channels/{}/messages", Uuid::new_v4()))
            .set_json(json!({ "type": "ping" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::GONE);
    }

    #[actix_rt::test]
    async fn test_unknown_message_type_is_rejected() {
        let state = setup_state();
        let (channel_id, _rx) = state.channels.open();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/channels/{}/messages", channel_id))
            .set_json(json!({ "type": "INIT", "message": "hello" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn test_federation_scope_is_enforced() {
        let state = setup_state();
        let hub = Arc::clone(&state.hub);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let ping = json!({
            "type": "hub-ping",
            "hubId": "h-remote",
            "origin": "https://b.example",
            "entries": [{ "frameId": "far:00001" }]
        });

        let req = test::TestRequest::post()
            .uri("/api/v1/federation/messages")
            .insert_header((SCOPE_HEADER, "other-scope"))
            .set_json(ping.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(hub.stats().hub_peers, 0);

        let req = test::TestRequest::post()
            .uri("/api/v1/federation/messages")
            .insert_header((SCOPE_HEADER, "test-scope"))
            .set_json(ping)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(hub.stats().hub_peers, 1);
    }

    #[actix_rt::test]
    async fn test_connect_opens_event_stream() {
        let state = setup_state();
        let channels = state.channels.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/connect").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        assert_eq!(channels.len(), 1);
    }
}
