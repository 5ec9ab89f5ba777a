//! Prometheus metrics integration

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    opts, register_int_counter, register_int_counter_vec, register_int_gauge, Encoder,
    IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

static ENDPOINTS_REGISTERED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(opts!(
        "frame_hub_endpoints_registered",
        "Number of directly registered endpoints"
    ))
    .expect("Failed to create endpoints gauge")
});

static HUB_PEERS_KNOWN: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(opts!(
        "frame_hub_hub_peers_known",
        "Number of peers known through other hubs"
    ))
    .expect("Failed to create hub peers gauge")
});

static PENDING_CALLS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(opts!(
        "frame_hub_pending_calls",
        "Number of calls awaiting a reply"
    ))
    .expect("Failed to create pending calls gauge")
});

static CALLS_DISPATCHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "frame_hub_calls_dispatched_total",
            "Service calls forwarded, by route"
        ),
        &["route"]
    )
    .expect("Failed to create calls dispatched counter")
});

static CALLS_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "frame_hub_calls_rejected_total",
            "Service calls and replies rejected, by error code"
        ),
        &["code"]
    )
    .expect("Failed to create calls rejected counter")
});

static FEDERATION_MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "frame_hub_federation_messages_total",
            "Federation messages, by direction and type"
        ),
        &["direction", "type"]
    )
    .expect("Failed to create federation messages counter")
});

static SELF_MESSAGES_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "frame_hub_self_messages_dropped_total",
        "Broadcast messages discarded because this hub published them"
    ))
    .expect("Failed to create self messages counter")
});

/// Initialize all metrics
pub fn init_metrics() {
    Lazy::force(&ENDPOINTS_REGISTERED);
    Lazy::force(&HUB_PEERS_KNOWN);
    Lazy::force(&PENDING_CALLS);
    Lazy::force(&CALLS_DISPATCHED_TOTAL);
    Lazy::force(&CALLS_REJECTED_TOTAL);
    Lazy::force(&FEDERATION_MESSAGES_TOTAL);
    Lazy::force(&SELF_MESSAGES_DROPPED_TOTAL);
}

/// Publish registry sizes
pub fn set_registry_sizes(endpoints: usize, hub_peers: usize, pending: usize) {
    ENDPOINTS_REGISTERED.set(endpoints as i64);
    HUB_PEERS_KNOWN.set(hub_peers as i64);
    PENDING_CALLS.set(pending as i64);
}

/// Record a forwarded call ("local" or "federated")
pub fn record_call_dispatched(route: &str) {
    CALLS_DISPATCHED_TOTAL.with_label_values(&[route]).inc();
}

/// Record a rejected call or reply
pub fn record_call_rejected(code: &str) {
    CALLS_REJECTED_TOTAL.with_label_values(&[code]).inc();
}

/// Record a federation message ("in" or "out")
pub fn record_federation_message(direction: &str, kind: &str) {
    FEDERATION_MESSAGES_TOTAL
        .with_label_values(&[direction, kind])
        .inc();
}

/// Record a dropped self-originated broadcast
pub fn record_self_message_dropped() {
    SELF_MESSAGES_DROPPED_TOTAL.inc();
}

/// Prometheus metrics endpoint, mounted at the configured path
pub async fn metrics_endpoint() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(format!("Failed to encode metrics: {}", e));
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(buffer)
}
