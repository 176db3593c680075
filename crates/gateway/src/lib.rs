//! HTTP API gateway for BizCanvas.
//!
//! Exposes REST endpoints for expert chat (sync and streaming SSE), the
//! expert catalog, token validation, audit views, profile CRUD, and health
//! checks. Built on Axum.
//!
//! The gateway is a thin collaborator around the workflow service: it
//! resolves the expert, pre-resolves the client profile for prompt context
//! (lookup failures degrade to no context), decodes base64 attachment
//! payloads, and maps turn outcomes onto HTTP statuses.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use bizcanvas_checkpoint::InMemoryCheckpointStore;
use bizcanvas_config::{AppConfig, GatewayConfig};
use bizcanvas_core::attachment::{Attachment, AttachmentKind};
use bizcanvas_core::expert::ExpertCatalog;
use bizcanvas_core::principal::{Principal, PrincipalLookup};
use bizcanvas_core::trace::TraceSink;
use bizcanvas_profiles::{InMemoryProfileStore, ProfileStoreError};
use bizcanvas_providers::OpenAiCompatProvider;
use bizcanvas_security::audit::{AuditLog, AuditRecord, AuditSummary};
use bizcanvas_telemetry::TracingTraceSink;
use bizcanvas_workflow::{ConversationWorkflow, TurnError, TurnRequest, WorkflowOptions};

/// Request body size limit — above the attachment cap plus base64 overhead.
const BODY_LIMIT_BYTES: usize = 12 * 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub workflow: ConversationWorkflow,
    pub experts: ExpertCatalog,
    pub profiles: Arc<InMemoryProfileStore>,
    pub audit: Arc<AuditLog>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState, cors_origins: &[String]) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            cors_origins.iter().filter_map(|o| o.parse().ok()),
        ))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .route("/experts", get(experts_handler))
        .route("/tokens/validate", get(validate_token_handler))
        .route("/audit", get(audit_records_handler))
        .route("/audit/summary", get(audit_summary_handler))
        .route("/profiles", get(list_profiles_handler).post(create_profile_handler))
        .route(
            "/profiles/{token}",
            get(get_profile_handler)
                .put(update_profile_handler)
                .delete(delete_profile_handler),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire all components from configuration and serve until shutdown.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let api_key = config.api_key.clone().unwrap_or_default();
    if api_key.is_empty() {
        warn!("No provider API key configured; generation calls will fail");
    }

    let provider = Arc::new(OpenAiCompatProvider::new("groq", &config.api_url, api_key));
    let profiles = Arc::new(InMemoryProfileStore::seeded().await);
    let checkpoint = Arc::new(InMemoryCheckpointStore::new());
    let audit = Arc::new(AuditLog::new());
    let trace: Arc<dyn TraceSink> = Arc::new(TracingTraceSink);

    let options = WorkflowOptions {
        model: config.model.clone(),
        summary_model: config.summary_model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        summary_trigger: config.workflow.summary_trigger,
        keep_after_summary: config.workflow.keep_after_summary,
        max_attachment_bytes: config.workflow.max_attachment_bytes,
    };

    let workflow = ConversationWorkflow::new(
        provider,
        profiles.clone(),
        checkpoint,
        audit.clone(),
        trace,
        options,
    );

    let state = Arc::new(GatewayState {
        workflow,
        experts: ExpertCatalog::builtin(),
        profiles,
        audit,
    });

    serve(state, &config.gateway).await
}

/// Serve a prepared state on the configured address.
pub async fn serve(
    state: SharedState,
    gateway: &GatewayConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state, &gateway.cors_origins);
    let addr = format!("{}:{}", gateway.host, gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "BizCanvas gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Error mapping ─────────────────────────────────────────────────────────

/// Gateway-level error with an HTTP status.
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "detail": self.detail }));
        (self.status, body).into_response()
    }
}

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl From<ProfileStoreError> for ApiError {
    fn from(e: ProfileStoreError) -> Self {
        match e {
            ProfileStoreError::AlreadyExists(_) => Self::new(StatusCode::CONFLICT, e.to_string()),
            ProfileStoreError::Lookup(err) => err.into(),
        }
    }
}

impl From<bizcanvas_core::error::LookupError> for ApiError {
    fn from(e: bizcanvas_core::error::LookupError) -> Self {
        use bizcanvas_core::error::LookupError;
        match e {
            LookupError::Connectivity(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Profile backend connection failed. Please try again later.",
            ),
            LookupError::Operation(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Profile backend operation failed. Please try again.",
            ),
        }
    }
}

// ── Health ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ── Chat ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    expert_id: String,
    #[serde(default)]
    user_token: Option<String>,
    #[serde(default)]
    image_base64: Option<String>,
    #[serde(default)]
    pdf_base64: Option<String>,
    #[serde(default)]
    pdf_name: Option<String>,
    #[serde(default)]
    new_thread: bool,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

/// Decode the optional attachment payload from the request.
fn decode_attachment(request: &ChatRequest) -> Result<Option<Attachment>, ApiError> {
    if let Some(image) = &request.image_base64 {
        let data = BASE64
            .decode(image)
            .map_err(|e| ApiError::bad_request(format!("Invalid image payload: {e}")))?;
        return Ok(Some(Attachment::new(AttachmentKind::Png, data)));
    }

    if let Some(pdf) = &request.pdf_base64 {
        let data = BASE64
            .decode(pdf)
            .map_err(|e| ApiError::bad_request(format!("Invalid PDF payload: {e}")))?;
        let mut attachment = Attachment::new(AttachmentKind::Pdf, data);
        if let Some(name) = &request.pdf_name {
            attachment = attachment.with_name(name);
        }
        return Ok(Some(attachment));
    }

    Ok(None)
}

/// Pre-resolve the client profile for prompt context.
/// Lookup failures degrade to "no context" rather than failing the turn.
async fn resolve_user_context(state: &GatewayState, token: Option<&str>) -> Option<Principal> {
    let token = token?;
    match state.profiles.lookup(token).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(error = %e, "Could not resolve client profile; continuing without context");
            None
        }
    }
}

async fn build_turn_request(
    state: &GatewayState,
    request: ChatRequest,
) -> Result<TurnRequest, ApiError> {
    let expert = state
        .experts
        .get(&request.expert_id)
        .map_err(|e| ApiError::not_found(e.to_string()))?
        .clone();

    let attachment = decode_attachment(&request)?;
    let user_context = resolve_user_context(state, request.user_token.as_deref()).await;

    let mut turn = TurnRequest::new(expert, request.message);
    turn.token = request.user_token;
    turn.user_context = user_context;
    turn.attachment = attachment;
    turn.new_thread = request.new_thread;
    Ok(turn)
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let turn = build_turn_request(&state, request).await?;
    let (response, final_state) = state.workflow.run_turn(turn).await?;

    if let Some(error) = &final_state.ingest_error {
        info!(thread_id = %final_state.thread_id, error, "Turn completed degraded");
    }

    Ok(Json(ChatResponse { response }))
}

async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let turn = build_turn_request(&state, request).await?;
    let rx = state.workflow.run_turn_stream(turn).await?;

    let stream = ReceiverStream::new(rx).map(|fragment| {
        let event = match fragment {
            Ok(text) => Event::default().data(text),
            Err(e) => Event::default().event("error").data(e.to_string()),
        };
        Ok(event)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// ── Experts ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ExpertsResponse {
    experts: Vec<ExpertInfo>,
}

#[derive(Serialize)]
struct ExpertInfo {
    id: String,
    name: String,
    domain: String,
    perspective: String,
    style: String,
}

async fn experts_handler(State(state): State<SharedState>) -> Json<ExpertsResponse> {
    let experts = state
        .experts
        .all()
        .iter()
        .map(|e| ExpertInfo {
            id: e.id.clone(),
            name: e.name.clone(),
            domain: e.domain.clone(),
            perspective: e.perspective.clone(),
            style: e.style.clone(),
        })
        .collect();
    Json(ExpertsResponse { experts })
}

// ── Token validation ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenQuery {
    token: String,
}

#[derive(Serialize)]
struct TokenValidation {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<TokenUserInfo>,
}

#[derive(Serialize)]
struct TokenUserInfo {
    business_name: String,
    sector: String,
    business_type: String,
}

/// Lookup failures yield `{"valid": false}` rather than a 5xx.
async fn validate_token_handler(
    State(state): State<SharedState>,
    Query(query): Query<TokenQuery>,
) -> Json<TokenValidation> {
    match state.profiles.lookup(&query.token).await {
        Ok(Some(user)) => Json(TokenValidation {
            valid: true,
            user: Some(TokenUserInfo {
                business_name: user.business_name,
                sector: user.sector,
                business_type: user.business_type,
            }),
        }),
        Ok(None) => Json(TokenValidation {
            valid: false,
            user: None,
        }),
        Err(e) => {
            warn!(error = %e, "Token validation lookup failed");
            Json(TokenValidation {
                valid: false,
                user: None,
            })
        }
    }
}

// ── Audit views ───────────────────────────────────────────────────────────

async fn audit_summary_handler(State(state): State<SharedState>) -> Json<AuditSummary> {
    Json(state.audit.summary())
}

async fn audit_records_handler(
    State(state): State<SharedState>,
    Query(query): Query<TokenQuery>,
) -> Json<Vec<AuditRecord>> {
    Json(state.audit.records_for_token(&query.token))
}

// ── Profile CRUD ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MutationResponse {
    status: &'static str,
    message: String,
}

async fn create_profile_handler(
    State(state): State<SharedState>,
    Json(profile): Json<Principal>,
) -> Result<(StatusCode, Json<MutationResponse>), ApiError> {
    let name = profile.business_name.clone();
    state.profiles.create(profile).await?;
    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            status: "success",
            message: format!("Profile '{name}' created."),
        }),
    ))
}

async fn list_profiles_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<Principal>>, ApiError> {
    Ok(Json(state.profiles.all().await?))
}

async fn get_profile_handler(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> Result<Json<Principal>, ApiError> {
    match state.profiles.lookup(&token).await? {
        Some(profile) => Ok(Json(profile)),
        None => Err(ApiError::not_found(format!(
            "Profile with token '{token}' not found."
        ))),
    }
}

async fn update_profile_handler(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    Json(profile): Json<Principal>,
) -> Result<Json<MutationResponse>, ApiError> {
    if token != profile.token {
        return Err(ApiError::bad_request(
            "Token in URL does not match token in request body.",
        ));
    }

    if state.profiles.update(&token, profile).await? {
        Ok(Json(MutationResponse {
            status: "success",
            message: format!("Profile '{token}' updated."),
        }))
    } else {
        Err(ApiError::not_found(format!(
            "Profile with token '{token}' not found. No update performed."
        )))
    }
}

async fn delete_profile_handler(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> Result<Json<MutationResponse>, ApiError> {
    if state.profiles.delete(&token).await? {
        Ok(Json(MutationResponse {
            status: "success",
            message: format!("Profile '{token}' deleted."),
        }))
    } else {
        Err(ApiError::not_found(format!(
            "Profile with token '{token}' not found. No deletion performed."
        )))
    }
}
