//! Axum + Askama web front end for EZW: browse, book, confirm.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use askama::Template;
use axum::{
    extract::{Form, Query, RawQuery, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use ezw_booking::{
    copy_booking_id, submit_today, summary_location, token_from_query, BookingConfirmation, Clipboard,
    CodecConfig, CopyNotice, IdGenerator, MemoryClipboard, OrderSummary, RandomIdGenerator,
    SummaryRenderer, SummaryState, TransferCodec, BROWSE_PATH,
};
use ezw_catalog::{CatalogProvider, Labels, StaticCatalog, REQUIRED_LABELS};
use ezw_core::{
    estimate, estimate_label, BookingDraft, BookingField, UrgencyTier, WorkerProfile, TIME_SLOTS,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub const CRATE_NAME: &str = "ezw-web";

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub port: u16,
    pub workspace_root: PathBuf,
    pub codec: CodecConfig,
}

impl WebConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("EZW_WEB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            workspace_root: std::env::var("EZW_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            codec: CodecConfig::from_env(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub workspace_root: PathBuf,
    pub catalog: Arc<dyn CatalogProvider>,
    pub labels: Arc<Labels>,
    pub ids: Arc<dyn IdGenerator>,
    pub clipboard: Arc<dyn Clipboard>,
    pub codec: TransferCodec,
}

impl AppState {
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        catalog: Arc<dyn CatalogProvider>,
        labels: Labels,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            catalog,
            labels: Arc::new(labels),
            ids: Arc::new(RandomIdGenerator),
            clipboard: Arc::new(MemoryClipboard::default()),
            codec: TransferCodec::default(),
        }
    }

    /// Load catalog and labels from the workspace root. Missing labels abort startup.
    pub fn load(workspace_root: impl Into<PathBuf>, codec: CodecConfig) -> anyhow::Result<Self> {
        let workspace_root = workspace_root.into();
        let catalog = StaticCatalog::from_workspace_root(&workspace_root)?;
        let labels = Labels::from_workspace_root(&workspace_root)?;
        labels
            .require(REQUIRED_LABELS)
            .context("checking label configuration")?;
        let mut state = Self::new(workspace_root, Arc::new(catalog), labels);
        state.codec = TransferCodec::new(codec);
        Ok(state)
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }
}

#[derive(Debug, Deserialize, Default)]
struct ServicesQuery {
    q: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct WorkersQuery {
    service: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct BookingQuery {
    worker: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct EstimateQuery {
    urgency: Option<String>,
}

/// Raw booking form fields as posted by the browser.
#[derive(Debug, Clone, Deserialize, Default)]
struct BookingFormInput {
    #[serde(default)]
    worker_id: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    time: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    urgency: String,
}

impl BookingFormInput {
    fn urgency(&self) -> Result<Option<UrgencyTier>, ezw_core::ConfigurationError> {
        if self.urgency.trim().is_empty() {
            return Ok(None);
        }
        self.urgency.parse().map(Some)
    }

    fn to_draft(&self, urgency: Option<UrgencyTier>) -> BookingDraft {
        fn text(v: &str) -> Option<String> {
            Some(v.to_string()).filter(|s| !s.is_empty())
        }
        BookingDraft {
            worker_id: text(&self.worker_id),
            scheduled_date: NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok(),
            scheduled_time: text(&self.time),
            location: text(&self.location),
            description: text(&self.description),
            urgency,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CopyForm {
    #[serde(default)]
    booking_id: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    labels: Arc<Labels>,
    total_services: usize,
    total_workers: usize,
    available_workers: usize,
    services: Vec<ezw_core::ServiceCategory>,
}

#[derive(Template)]
#[template(path = "services.html")]
struct ServicesTemplate {
    labels: Arc<Labels>,
    query: String,
    services: Vec<ezw_core::ServiceCategory>,
}

#[derive(Debug, Clone)]
struct FacetRow {
    key: String,
    display_name: String,
    count: usize,
    selected: bool,
}

#[derive(Debug, Clone)]
struct WorkerRow {
    id: String,
    name: String,
    service_name: String,
    rating: f32,
    experience_years: u32,
    location: String,
    price_range: String,
    skills_text: String,
    available: bool,
    verified: bool,
}

#[derive(Template)]
#[template(path = "workers.html")]
struct WorkersTemplate {
    labels: Arc<Labels>,
    all_selected: bool,
    facets: Vec<FacetRow>,
    workers: Vec<WorkerRow>,
}

#[derive(Debug, Clone)]
struct SlotRow {
    label: &'static str,
    selected: bool,
}

#[derive(Debug, Clone)]
struct UrgencyRow {
    value: &'static str,
    label: String,
    estimate: String,
    selected: bool,
}

#[derive(Template)]
#[template(path = "booking.html")]
struct BookingTemplate {
    labels: Arc<Labels>,
    worker: WorkerProfile,
    service_name: String,
    skills_text: String,
    form: BookingFormInput,
    min_date: String,
    slots: Vec<SlotRow>,
    urgencies: Vec<UrgencyRow>,
    estimate: String,
    error_field: String,
    error_message: String,
}

#[derive(Template)]
#[template(path = "order_summary.html")]
struct OrderSummaryTemplate {
    labels: Arc<Labels>,
    booking_id: String,
    worker_name: String,
    worker_rating: f32,
    worker_experience: u32,
    worker_location: String,
    worker_phone: String,
    service_name: String,
    description: String,
    urgency: String,
    scheduled_date: String,
    scheduled_time: String,
    location: String,
    base_cost: String,
    platform_fee: u32,
    fee_applied: bool,
    total_cost: String,
}

impl OrderSummaryTemplate {
    fn new(labels: Arc<Labels>, c: &BookingConfirmation) -> Self {
        Self {
            labels,
            booking_id: c.booking_id.clone(),
            worker_name: c.worker.name.clone(),
            worker_rating: c.worker.rating,
            worker_experience: c.worker.experience_years,
            worker_location: c.worker.location.clone(),
            worker_phone: c.worker.phone.clone().unwrap_or_default(),
            service_name: c.service_name().to_string(),
            description: c.description.clone(),
            urgency: c.urgency.to_string(),
            scheduled_date: c.scheduled_date_display(),
            scheduled_time: c.scheduled_time.clone(),
            location: c.location.clone(),
            base_cost: c.base_cost.clone(),
            platform_fee: c.platform_fee,
            fee_applied: c.fee_applied(),
            total_cost: c.total_cost_display(),
        }
    }
}

#[derive(Template)]
#[template(path = "message.html")]
struct MessageTemplate {
    labels: Arc<Labels>,
    heading: String,
    detail: String,
    link_href: String,
    link_text: String,
}

#[derive(Template)]
#[template(path = "copy_notice_partial.html")]
struct CopyNoticePartialTemplate {
    title: String,
    description: String,
    failed: bool,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/services", get(services_handler))
        .route("/workers", get(workers_handler))
        .route("/booking", get(booking_form_handler).post(booking_submit_handler))
        .route("/order-summary", get(order_summary_handler))
        .route("/order-summary/copy", post(copy_booking_id_handler))
        .route("/estimate", get(estimate_handler))
        .route("/assets/static/app.css", get(app_css_handler))
        .with_state(Arc::new(state))
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    serve(WebConfig::from_env()).await
}

pub async fn serve(config: WebConfig) -> anyhow::Result<()> {
    let state = AppState::load(&config.workspace_root, config.codec)?;
    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("binding port {}", config.port))?;
    info!(port = config.port, root = %config.workspace_root.display(), "serving");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let services = state.catalog.list_service_categories();
    let workers = state.catalog.list_workers(None);
    render_html(IndexTemplate {
        labels: state.labels.clone(),
        total_services: services.len(),
        total_workers: workers.len(),
        available_workers: workers.iter().filter(|w| w.available).count(),
        services,
    })
}

async fn services_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ServicesQuery>,
) -> Response {
    let query = query.q.unwrap_or_default();
    render_html(ServicesTemplate {
        labels: state.labels.clone(),
        services: state.catalog.search_service_categories(&query),
        query,
    })
}

async fn workers_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WorkersQuery>,
) -> Response {
    let selected = query
        .service
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "all");
    let catalog = state.catalog.as_ref();

    let mut counts = BTreeMap::<String, usize>::new();
    for w in catalog.list_workers(None) {
        *counts.entry(w.service_key).or_default() += 1;
    }
    let facets = catalog
        .list_service_categories()
        .into_iter()
        .map(|s| FacetRow {
            count: counts.get(&s.key).copied().unwrap_or(0),
            selected: selected.as_deref() == Some(s.key.as_str()),
            key: s.key,
            display_name: s.display_name,
        })
        .collect::<Vec<_>>();

    let workers = catalog
        .list_workers(selected.as_deref())
        .into_iter()
        .map(|w| WorkerRow {
            service_name: service_name(catalog, &w.service_key),
            skills_text: w.skills.join(", "),
            id: w.id,
            name: w.name,
            rating: w.rating,
            experience_years: w.experience_years,
            location: w.location,
            price_range: w.price_range,
            available: w.available,
            verified: w.verified,
        })
        .collect::<Vec<_>>();

    render_html(WorkersTemplate {
        labels: state.labels.clone(),
        all_selected: selected.is_none(),
        facets,
        workers,
    })
}

async fn booking_form_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookingQuery>,
) -> Response {
    let worker_id = query.worker.unwrap_or_default();
    let form = BookingFormInput {
        worker_id,
        ..Default::default()
    };
    render_booking_form(&state, form, None, StatusCode::OK)
}

async fn booking_submit_handler(
    State(state): State<Arc<AppState>>,
    Form(input): Form<BookingFormInput>,
) -> Response {
    let urgency = match input.urgency() {
        Ok(urgency) => urgency,
        Err(err) => {
            warn!(%err, "rejecting booking with unknown urgency");
            return (StatusCode::BAD_REQUEST, Html(err.to_string())).into_response();
        }
    };
    let draft = input.to_draft(urgency);
    let request = match submit_today(&draft, state.catalog.as_ref()) {
        Ok(request) => request,
        Err(err) => {
            return render_booking_form(
                &state,
                input,
                Some(FieldError::invalid(err.field)),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
        }
    };
    match state.codec.encode(&request) {
        Ok(token) => Redirect::to(&summary_location(&token)).into_response(),
        Err(err) => render_booking_form(
            &state,
            input,
            Some(FieldError::too_long(err.field)),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
    }
}

/// Inline form error: the offending field and the label key of its message.
#[derive(Debug, Clone)]
struct FieldError {
    field: BookingField,
    label: String,
}

impl FieldError {
    fn invalid(field: BookingField) -> Self {
        Self {
            field,
            label: format!("errors.{}", field.as_str()),
        }
    }

    fn too_long(field: BookingField) -> Self {
        Self {
            field,
            label: "errors.too_long".to_string(),
        }
    }
}

fn render_booking_form(
    state: &AppState,
    form: BookingFormInput,
    error: Option<FieldError>,
    status: StatusCode,
) -> Response {
    let labels = state.labels.clone();
    let worker = match state.catalog.get_worker(form.worker_id.trim()) {
        Ok(worker) => worker,
        Err(err) => {
            warn!(worker_id = %err.worker_id, "booking form for unknown worker");
            let tpl = MessageTemplate {
                heading: labels.text("errors.worker").to_string(),
                detail: err.to_string(),
                link_href: "/workers".to_string(),
                link_text: labels.text("nav.workers").to_string(),
                labels,
            };
            return render_html_with_status(StatusCode::NOT_FOUND, tpl);
        }
    };
    if !worker.available {
        warn!(worker_id = %worker.id, "booking form for unavailable worker");
        let status = if status == StatusCode::OK {
            StatusCode::CONFLICT
        } else {
            status
        };
        let tpl = MessageTemplate {
            heading: labels.text("workers.unavailable").to_string(),
            detail: format!("{} {}", worker.name, labels.text("errors.unavailable")),
            link_href: "/workers".to_string(),
            link_text: labels.text("nav.workers").to_string(),
            labels,
        };
        return render_html_with_status(status, tpl);
    }

    let selected_urgency = form.urgency.parse::<UrgencyTier>().unwrap_or_default();
    let slots = TIME_SLOTS
        .iter()
        .map(|label| SlotRow {
            label,
            selected: form.time == *label,
        })
        .collect();
    let urgencies = UrgencyTier::ALL
        .into_iter()
        .map(|tier| UrgencyRow {
            value: tier.as_str(),
            label: labels.text(&format!("booking.{}", tier.as_str())).to_string(),
            estimate: estimate(tier).to_string(),
            selected: tier == selected_urgency,
        })
        .collect();
    let (error_field, error_message) = match error {
        Some(err) => (
            err.field.as_str().to_string(),
            labels.text(&err.label).to_string(),
        ),
        None => (String::new(), String::new()),
    };

    let tpl = BookingTemplate {
        service_name: service_name(state.catalog.as_ref(), &worker.service_key),
        skills_text: worker.skills.join(", "),
        worker,
        form,
        min_date: Local::now().date_naive().format("%Y-%m-%d").to_string(),
        slots,
        urgencies,
        estimate: estimate(selected_urgency).to_string(),
        error_field,
        error_message,
        labels,
    };
    render_html_with_status(status, tpl)
}

async fn order_summary_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Response {
    let renderer = SummaryRenderer::new(state.catalog.as_ref(), state.ids.as_ref(), state.codec);
    let mut summary = OrderSummary::new();
    match summary.resolve(&renderer, token_from_query(query.as_deref())) {
        SummaryState::Confirmed(confirmation) => {
            render_html(OrderSummaryTemplate::new(state.labels.clone(), confirmation))
        }
        SummaryState::NotFound(_) | SummaryState::Loading => {
            let labels = state.labels.clone();
            render_html(MessageTemplate {
                heading: labels.text("order_summary.not_found").to_string(),
                detail: String::new(),
                link_href: BROWSE_PATH.to_string(),
                link_text: labels.text("order_summary.browse_services").to_string(),
                labels,
            })
        }
    }
}

async fn copy_booking_id_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CopyForm>,
) -> Response {
    let booking_id = form.booking_id.trim();
    if booking_id.is_empty() {
        return (StatusCode::BAD_REQUEST, Html("missing booking id".to_string())).into_response();
    }
    let notice = copy_booking_id(state.clipboard.as_ref(), booking_id).await;
    render_html(CopyNoticePartialTemplate {
        title: notice.title().to_string(),
        description: notice.description(),
        failed: matches!(notice, CopyNotice::Failed { .. }),
    })
}

async fn estimate_handler(Query(query): Query<EstimateQuery>) -> Response {
    let label = query.urgency.unwrap_or_else(|| UrgencyTier::default().to_string());
    match estimate_label(&label) {
        Ok(range) => Json(serde_json::json!({
            "urgency": label.trim().to_ascii_lowercase(),
            "range": range.to_string(),
            "low": range.low,
            "high": range.high,
        }))
        .into_response(),
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

async fn app_css_handler(State(state): State<Arc<AppState>>) -> Response {
    let css_path = state.workspace_root.join("assets/static/app.css");
    match tokio::fs::read_to_string(&css_path).await {
        Ok(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, Html("/* missing app.css */".to_string())).into_response(),
    }
}

fn service_name(catalog: &dyn CatalogProvider, key: &str) -> String {
    catalog
        .service_category(key)
        .map(|s| s.display_name)
        .unwrap_or_else(|| key.to_string())
}

fn render_html<T: Template>(tpl: T) -> Response {
    render_html_with_status(StatusCode::OK, tpl)
}

fn render_html_with_status<T: Template>(status: StatusCode, tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use ezw_booking::{DeniedClipboard, SequenceIdGenerator};
    use http_body_util::BodyExt;
    use std::path::Path;
    use tower::ServiceExt;

    const VALID_FORM: &str = "worker_id=1&date=2099-01-01&time=10%3A00+AM&location=12+Main+St&description=Fix+outlet&urgency=medium";

    fn workspace_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .canonicalize()
            .unwrap()
    }

    fn test_state() -> AppState {
        AppState::load(workspace_root(), CodecConfig::default())
            .unwrap()
            .with_ids(Arc::new(SequenceIdGenerator::default()))
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, body: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn handler_smoke_get_index() {
        let resp = app(test_state()).oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("EZ Work"));
        assert!(text.contains("8 services"));
    }

    #[tokio::test]
    async fn services_search_filters_categories() {
        let resp = app(test_state()).oneshot(get("/services?q=pipe")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("Plumber"));
        assert!(!text.contains("Gardener"));
    }

    #[tokio::test]
    async fn workers_filter_by_service() {
        let resp = app(test_state())
            .oneshot(get("/workers?service=painter"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("Ravi Patel"));
        assert!(!text.contains("Rajesh Kumar"));

        let all = app(test_state()).oneshot(get("/workers?service=all")).await.unwrap();
        let text = body_text(all).await;
        assert!(text.contains("Rajesh Kumar") && text.contains("Amit Singh"));
    }

    #[tokio::test]
    async fn booking_form_renders_worker_card() {
        let resp = app(test_state()).oneshot(get("/booking?worker=1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("Rajesh Kumar"));
        assert!(text.contains("500-800"));
        assert!(text.contains("07:00 PM"));

        let missing = app(test_state()).oneshot(get("/booking?worker=77")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn booking_submit_redirects_to_confirmed_summary() {
        let app = app(test_state());
        let resp = app
            .clone()
            .oneshot(post_form("/booking", VALID_FORM))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let location = resp.headers()[header::LOCATION].to_str().unwrap().to_string();
        assert!(location.starts_with("/order-summary?booking="));

        let summary = app.oneshot(get(&location)).await.unwrap();
        assert_eq!(summary.status(), StatusCode::OK);
        let text = body_text(summary).await;
        assert!(text.contains("Booking Confirmed!"));
        assert!(text.contains("EZ000001"));
        assert!(text.contains("500-850"));
        assert!(text.contains("12 Main St"));
        assert!(text.contains("January 1, 2099"));
    }

    #[tokio::test]
    async fn booking_submit_reports_missing_field_inline() {
        let body = VALID_FORM.replace("location=12+Main+St", "location=");
        let resp = app(test_state()).oneshot(post_form("/booking", &body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let text = body_text(resp).await;
        assert!(text.contains("Please enter the service address"));
        assert!(text.contains("Fix outlet"));
    }

    #[tokio::test]
    async fn booking_submit_keeps_oversized_booking_on_form() {
        let long = "a".repeat(5000);
        let body = VALID_FORM.replace("description=Fix+outlet", &format!("description={long}"));
        let resp = app(test_state()).oneshot(post_form("/booking", &body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(resp.headers().get(header::LOCATION).is_none());
        let text = body_text(resp).await;
        assert!(text.contains("This is too long to send with the booking"));
    }

    #[tokio::test]
    async fn unavailable_worker_cannot_be_booked() {
        let resp = app(test_state()).oneshot(get("/booking?worker=3")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert!(body_text(resp).await.contains("Amit Singh is not taking bookings"));

        let body = VALID_FORM.replace("worker_id=1", "worker_id=3");
        let resp = app(test_state()).oneshot(post_form("/booking", &body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(resp.headers().get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn booking_submit_rejects_unknown_urgency() {
        let body = VALID_FORM.replace("urgency=medium", "urgency=whenever");
        let resp = app(test_state()).oneshot(post_form("/booking", &body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn order_summary_without_token_shows_recovery() {
        for uri in ["/order-summary", "/order-summary?booking=%7Bbroken"] {
            let resp = app(test_state()).oneshot(get(uri)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let text = body_text(resp).await;
            assert!(text.contains("No Booking Found"), "{uri}");
            assert!(text.contains("href=\"/services\""), "{uri}");
        }
    }

    #[tokio::test]
    async fn copy_partial_reports_success_and_denial() {
        let clipboard = Arc::new(MemoryClipboard::default());
        let state = test_state().with_clipboard(clipboard.clone());
        let resp = app(state)
            .oneshot(post_form("/order-summary/copy", "booking_id=EZ000009"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Booking ID Copied"));
        assert_eq!(clipboard.contents().await.as_deref(), Some("EZ000009"));

        let denied = test_state().with_clipboard(Arc::new(DeniedClipboard));
        let resp = app(denied)
            .oneshot(post_form("/order-summary/copy", "booking_id=EZ000009"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("clipboard permission denied"));
    }

    #[tokio::test]
    async fn estimate_json_and_unknown_tier() {
        let resp = app(test_state()).oneshot(get("/estimate?urgency=high")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE].to_str().unwrap(), "application/json");
        let value: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(value["range"], "700-1000");

        let bad = app(test_state()).oneshot(get("/estimate?urgency=soon")).await.unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }
}
