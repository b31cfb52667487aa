use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};

static AUTH_SUCCESS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "message_auth_service_auth_success_total",
        "Messages whose token the gateway accepted",
    )
    .expect("failed to create message_auth_service_auth_success_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register message_auth_service_auth_success_total");
    counter
});

static AUTH_FAILURE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "message_auth_service_auth_failure_total",
            "Messages whose token the gateway rejected",
        ),
        &["reason"],
    )
    .expect("failed to create message_auth_service_auth_failure_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register message_auth_service_auth_failure_total");
    counter
});

static MESSAGES_PROCESSED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "message_auth_service_messages_processed_total",
            "Messages handled, by authentication outcome",
        ),
        &["outcome"],
    )
    .expect("failed to create message_auth_service_messages_processed_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register message_auth_service_messages_processed_total");
    counter
});

static PROTECTED_DENIED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "message_auth_service_protected_denied_total",
            "Protected operation probes that were denied or failed",
        ),
        &["operation"],
    )
    .expect("failed to create message_auth_service_protected_denied_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register message_auth_service_protected_denied_total");
    counter
});

pub fn record_auth_success() {
    AUTH_SUCCESS_TOTAL.inc();
}

pub fn record_auth_failure(reason: &str) {
    AUTH_FAILURE_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_message_outcome(outcome: &str) {
    MESSAGES_PROCESSED_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_operation_denied(operation: &str) {
    PROTECTED_DENIED_TOTAL.with_label_values(&[operation]).inc();
}

pub async fn serve_metrics() -> HttpResponse {
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
