use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, TextEncoder};

pub static HUB_ONLINE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "chat_hub_online_connections",
        "Users with a registered live connection in this process",
    )
    .expect("failed to create chat_hub_online_connections");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register chat_hub_online_connections");
    gauge
});

pub static HUB_PUSH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("chat_hub_push_total", "Hub push attempts by outcome"),
        &["outcome"],
    )
    .expect("failed to create chat_hub_push_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register chat_hub_push_total");
    counter
});

pub static RESOLVER_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "chat_resolver_lookups_total",
            "Private conversation resolutions by source",
        ),
        &["source"],
    )
    .expect("failed to create chat_resolver_lookups_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register chat_resolver_lookups_total");
    counter
});

pub static CACHE_WRITE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "chat_cache_write_failures_total",
        "Post-commit cache writes that failed or timed out",
    )
    .expect("failed to create chat_cache_write_failures_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register chat_cache_write_failures_total");
    counter
});

#[derive(Debug, Clone, Copy)]
pub enum PushOutcome {
    Delivered,
    Offline,
    Evicted,
}

impl PushOutcome {
    fn as_label(self) -> &'static str {
        match self {
            PushOutcome::Delivered => "delivered",
            PushOutcome::Offline => "offline",
            PushOutcome::Evicted => "evicted",
        }
    }
}

/// Touches every collector so `/metrics` lists them before first use.
pub fn register() {
    Lazy::force(&HUB_ONLINE_CONNECTIONS);
    Lazy::force(&HUB_PUSH_TOTAL);
    Lazy::force(&RESOLVER_LOOKUPS_TOTAL);
    Lazy::force(&CACHE_WRITE_FAILURES_TOTAL);
}

pub fn record_push(outcome: PushOutcome) {
    HUB_PUSH_TOTAL.with_label_values(&[outcome.as_label()]).inc();
}

pub fn record_resolver_lookup(source: &str) {
    RESOLVER_LOOKUPS_TOTAL.with_label_values(&[source]).inc();
}

pub async fn metrics_handler() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
