//! HTTP Endpoints
//!
//! REST API for business records, credit scores and the credit chat.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Json, MatchedPath, Query, Request, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{Html, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use creditai_core::{BusinessRecord, CreditRecord};
use creditai_llm::build_business_prompt;
use creditai_scoring::ScoreResult;

use crate::conversation::conversation_key;
use crate::demo::sample_business_profile;
use crate::metrics::{metrics_handler, record_chat, record_llm_latency, record_request, record_score};
use crate::state::AppState;
use crate::{ServerError, MISSING_GST_MESSAGE};

const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );

    Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Business records
        .route("/get_testcase", get(get_testcase))
        .route("/get_social_analysis", get(get_social_analysis))
        .route("/post_credit_data", post(post_credit_data))
        .route("/api/credit-data", post(post_credit_data))
        // Scoring
        .route("/get_credit_score", get(get_credit_score))
        // Chat
        .route("/api/load-business-data", post(load_business_data))
        .route("/api/chat", post(chat))
        .route_layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If no configured origin parses, falls back to the local frontend
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods(ALLOWED_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to localhost:3000");
        return layer.allow_origin(HeaderValue::from_static("http://localhost:3000"));
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    layer.allow_origin(parsed_origins)
}

/// Count requests by matched route and status
async fn track_requests(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;
    record_request(&route, response.status());
    response
}

#[derive(Debug, Deserialize)]
struct GstQuery {
    gst_in: Option<String>,
}

impl GstQuery {
    /// Unwrap the extractor, rendering a malformed query as a JSON 400
    fn require_from(query: Result<Query<GstQuery>, QueryRejection>) -> Result<String, ServerError> {
        let Query(query) = query.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
        query.require()
    }

    /// The `gst_in` parameter; missing or empty is a 400
    fn require(self) -> Result<String, ServerError> {
        self.gst_in
            .filter(|g| !g.is_empty())
            .ok_or_else(|| ServerError::InvalidRequest(MISSING_GST_MESSAGE.to_string()))
    }
}

async fn home() -> Html<&'static str> {
    Html(
        "<h1>GST Testcase API</h1>\n\
         <p>Use /get_testcase?gst_in=YOUR_GST_IN to retrieve data</p>",
    )
}

/// `GET /get_testcase?gst_in=` - the stored row for a GST identifier
async fn get_testcase(
    State(state): State<AppState>,
    query: Result<Query<GstQuery>, QueryRejection>,
) -> Result<Json<BusinessRecord>, ServerError> {
    let gst_in = GstQuery::require_from(query)?;
    let record = state.store.find_by_gst(state.records_table(), &gst_in).await?;
    Ok(Json(record))
}

/// `GET /get_social_analysis?gst_in=` - the social media analysis row
async fn get_social_analysis(
    State(state): State<AppState>,
    query: Result<Query<GstQuery>, QueryRejection>,
) -> Result<Json<BusinessRecord>, ServerError> {
    let gst_in = GstQuery::require_from(query)?;
    let record = state.store.find_by_gst(state.social_table(), &gst_in).await?;
    Ok(Json(record))
}

/// `GET /get_credit_score?gst_in=` - model score for the stored row
async fn get_credit_score(
    State(state): State<AppState>,
    query: Result<Query<GstQuery>, QueryRejection>,
) -> Result<Json<Value>, ServerError> {
    let gst_in = GstQuery::require_from(query)?;
    let record = state.store.find_by_gst(state.records_table(), &gst_in).await?;

    // artifact loading touches the filesystem
    let scorer = state.scorer.clone();
    let result: ScoreResult = tokio::task::spawn_blocking(move || scorer.score(&record))
        .await
        .map_err(|e| ServerError::Internal(format!("scoring task failed: {}", e)))?;

    record_score(result.outcome());
    tracing::info!(
        gst_in = %gst_in,
        outcome = result.outcome(),
        score = result.value(),
        "Credit score computed"
    );

    Ok(Json(json!({ "credit_score": result.value().round() })))
}

/// `POST /post_credit_data` - append one credit record
async fn post_credit_data(
    State(state): State<AppState>,
    payload: Result<Json<CreditRecord>, JsonRejection>,
) -> Result<Json<Value>, ServerError> {
    let Json(record) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;

    state
        .store
        .insert_credit_record(state.records_table(), &record)
        .await?;

    tracing::info!(gst_in = %record.gst_in, user_id = record.user_id, "Stored credit record");
    Ok(Json(json!({ "message": "Data stored successfully" })))
}

#[derive(Debug, Deserialize)]
struct LoadBusinessRequest {
    #[serde(rename = "businessId", default)]
    business_id: Option<String>,
}

/// `POST /api/load-business-data` - profile for the chat frontend
///
/// The demo id is answered from the built-in profile; any other id is looked
/// up as a GST identifier in the records table.
async fn load_business_data(
    State(state): State<AppState>,
    payload: Result<Json<LoadBusinessRequest>, JsonRejection>,
) -> Result<Json<Value>, ServerError> {
    let Json(request) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let not_found = || ServerError::NotFound("Business ID not found".to_string());

    let business_id = request
        .business_id
        .filter(|id| !id.is_empty())
        .ok_or_else(not_found)?;

    if business_id == state.config.chat.demo_business_id {
        return Ok(Json(sample_business_profile(&business_id)));
    }

    match state.store.find_by_gst(state.records_table(), &business_id).await {
        Ok(record) => Ok(Json(Value::Object(record.into_inner()))),
        Err(e) if e.is_not_found() => Err(not_found()),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(rename = "businessData", default)]
    business_data: Value,
    #[serde(rename = "userMessage", default)]
    user_message: Option<String>,
}

/// `POST /api/chat` - answer a question about the business data
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ServerError> {
    let Json(request) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let user_message = request
        .user_message
        .ok_or_else(|| ServerError::InvalidRequest("userMessage is required".to_string()))?;

    let key = conversation_key(&request.business_data, &state.config.chat.fallback_session_key);
    let prompt = build_business_prompt(&request.business_data, &user_message);

    let conversation = state.conversations.get_or_create(&key);
    match conversation.exchange(prompt, state.llm.as_ref()).await {
        Ok(result) => {
            record_chat("ok");
            record_llm_latency(result.total_time_ms);
            tracing::debug!(key = %key, latency_ms = result.total_time_ms, "Chat answered");
            Ok(Json(json!({ "response": result.text })))
        },
        Err(e) => {
            record_chat("error");
            tracing::warn!(key = %key, error = %e, "Chat generation failed");
            Err(e.into())
        },
    }
}

/// Health check with scorer, store and chat status
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let store_ok = match state.store.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Record store health check failed");
            false
        },
    };
    let llm_available = state.llm.is_available().await;

    let checks = json!({
        "store": {
            "status": if store_ok { "ok" } else { "unreachable" },
            "backend": state.store.backend(),
        },
        "scorer": {
            "state": state.scorer.state(),
            "model_path": state.config.scoring.model_path.clone(),
            "default_score": state.scorer.default_score(),
        },
        "chat": {
            "status": if llm_available { "ok" } else { "unavailable" },
            "model": state.llm.model_name(),
            "conversations": state.conversations.count(),
            "capacity": state.conversations.capacity(),
        },
    });

    // the chat backend only degrades the report; the store gates readiness
    let healthy = store_ok && llm_available;
    let status_code = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(json!({
            "status": if healthy { "healthy" } else { "degraded" },
            "version": env!("CARGO_PKG_VERSION"),
            "checks": checks,
        })),
    )
}
