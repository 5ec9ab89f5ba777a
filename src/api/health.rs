//! Liveness, readiness and health reporting for one hub

use actix_web::{get, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::services::{Hub, HubStats};

/// Health report with the hub's registry sizes
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub name: String,
    pub hub_id: String,
    pub stats: HubStats,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<f64>,
}

impl HealthResponse {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            status: "healthy".to_string(),
            version: state.version.clone(),
            name: state.name.clone(),
            hub_id: state.hub.id().to_string(),
            stats: state.hub.stats(),
            timestamp: Utc::now(),
            uptime_seconds: None,
        }
    }

    pub fn with_uptime(mut self, uptime: f64) -> Self {
        self.uptime_seconds = Some(uptime);
        self
    }
}

/// Process-level state for health reporting
#[derive(Clone)]
pub struct AppState {
    pub name: String,
    pub hub: Arc<Hub>,
    pub version: String,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(name: impl Into<String>, hub: Arc<Hub>) -> Self {
        Self {
            name: name.into(),
            hub,
            version: crate::VERSION.to_string(),
            start_time: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> f64 {
        let duration = Utc::now().signed_duration_since(self.start_time);
        duration.num_milliseconds() as f64 / 1000.0
    }
}

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse::from_state(&state).with_uptime(state.uptime_seconds());
    HttpResponse::Ok().json(response)
}

/// The hub accepts peer channels as soon as it is constructed
#[get("/ready")]
pub async fn readiness_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse::from_state(&state))
}

#[get("/live")]
pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "alive"
    }))
}

pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(readiness_check)
        .service(liveness_check);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MemoryChannel, ReplyHandle, RosterNotifier};
    use crate::federation::NullBroadcast;
    use crate::models::HubId;
    use actix_web::{test, App};

    #[actix_rt::test]
    async fn test_health_reports_hub_stats() {
        let hub = Hub::with_id(
            HubId::from("h-health"),
            Arc::new(NullBroadcast),
            Arc::new(RosterNotifier::new()),
        );
        let (channel, _rx) = MemoryChannel::new();
        hub.register(&ReplyHandle::new(channel), "https://a.example", None);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new("edge", Arc::clone(&hub))))
                .configure(configure_health_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["hub_id"], "h-health");
        assert_eq!(body["stats"]["endpoints"], 1);
        assert_eq!(body["stats"]["pending_calls"], 0);
        assert!(body["uptime_seconds"].is_number());
    }
}
