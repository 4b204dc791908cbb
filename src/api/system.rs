//! API index, liveness and health endpoints.

use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{ApiResponse, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub environment: String,
    pub database: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiIndex {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub features: Vec<String>,
    pub status: String,
    pub environment: String,
}

/// Routes served now plus the ones the platform will add.
const ENDPOINTS: &[(&str, &str)] = &[
    ("health", "/health"),
    ("auth", "/api/v1/auth"),
    ("admin", "/api/v1/admin"),
    ("users", "/api/v1/users"),
    ("challenges", "/api/v1/challenges"),
    ("trades", "/api/v1/trades"),
    ("market-data", "/api/v1/market-data"),
    ("leaderboard", "/api/v1/leaderboard"),
];

const FEATURES: &[&str] = &[
    "User Authentication & Authorization",
    "Trading Challenge Management",
    "Real-time Market Data",
    "Trade Execution & Management",
    "AI Trading Signals",
    "Performance Analytics",
    "Global Leaderboard",
    "Payment Processing",
];

/// `GET /api/v1/`
pub async fn index() -> ApiResponse<ApiIndex> {
    let endpoints = ENDPOINTS
        .iter()
        .map(|(name, path)| ((*name).to_string(), (*path).to_string()))
        .collect();

    ApiResponse::with_message(
        "Welcome to TradeSense AI Platform API v1",
        ApiIndex {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            endpoints,
        },
    )
}

/// `GET /api/v1/info`
pub async fn info(State(state): State<Arc<AppState>>) -> ApiResponse<ApiInfo> {
    ApiResponse::success(ApiInfo {
        name: "TradeSense AI Platform API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "RESTful API for prop trading platform with AI-powered insights"
            .to_string(),
        features: FEATURES.iter().map(ToString::to_string).collect(),
        status: "operational".to_string(),
        environment: state.config().general.environment.to_string(),
    })
}

/// `GET /api/v1/ping`
pub async fn ping() -> ApiResponse<()> {
    ApiResponse::message("pong")
}

/// `GET /health`
///
/// Checks database connectivity. Answers 503 when the database is unreachable.
pub async fn health(State(state): State<Arc<AppState>>) -> ApiResponse<HealthResponse> {
    let db_ok = match state.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Health check database ping failed: {e:#}");
            false
        }
    };

    let body = HealthResponse {
        status: if db_ok { "healthy" } else { "unhealthy" }.to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config().general.environment.to_string(),
        database: if db_ok { "connected" } else { "disconnected" }.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };

    let response = ApiResponse::success(body);
    if db_ok {
        response
    } else {
        ApiResponse {
            success: false,
            ..response.with_status(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
