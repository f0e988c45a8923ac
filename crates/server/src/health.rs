use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use threadloom_discord::gateway::GatewayStatus;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    gateway: Arc<GatewayStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UploadCounters {
    pub processed: u64,
    pub failed: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub gateway: HealthCheck,
    pub uploads: UploadCounters,
    pub checked_at: String,
}

pub fn router(gateway: Arc<GatewayStatus>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { gateway })
}

pub async fn spawn(bind_address: &str, port: u16, gateway: Arc<GatewayStatus>) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(gateway)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let gateway = gateway_check(&state.gateway);
    let ready = gateway.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "threadloom-server runtime initialized".to_string(),
        },
        gateway,
        uploads: UploadCounters {
            processed: state.gateway.uploads_processed(),
            failed: state.gateway.uploads_failed(),
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn gateway_check(gateway: &GatewayStatus) -> HealthCheck {
    if gateway.is_connected() {
        HealthCheck { status: "ready", detail: "discord gateway session is live".to_string() }
    } else {
        HealthCheck { status: "degraded", detail: "discord gateway is not connected".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, extract::State, http::Request, http::StatusCode, Json};
    use threadloom_discord::gateway::GatewayStatus;
    use tower::ServiceExt;

    use crate::health::{health, router, HealthState};

    #[tokio::test]
    async fn health_returns_ready_when_gateway_is_connected() {
        let gateway = Arc::new(GatewayStatus::default());
        gateway.set_connected(true);

        let (status, Json(payload)) = health(State(HealthState { gateway })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.gateway.status, "ready");
        assert_eq!(payload.uploads.processed, 0);
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_before_gateway_is_ready() {
        let gateway = Arc::new(GatewayStatus::default());

        let (status, Json(payload)) = health(State(HealthState { gateway })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.service.status, "ready");

        let body = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(body["gateway"]["status"], "degraded");
    }

    #[tokio::test]
    async fn router_serves_health_route_only() {
        let gateway = Arc::new(GatewayStatus::default());
        gateway.set_connected(true);
        let app = router(gateway);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("health response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("fallback response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
