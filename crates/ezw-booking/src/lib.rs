//! Booking pipeline: form submission, transfer token codec and order summary rendering.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use ezw_catalog::CatalogProvider;
use ezw_core::{
    estimate, is_known_time_slot, BookingDraft, BookingField, BookingParts, BookingRequest,
    ClipboardError, DecodeError, DecodeReason, ParseError, PriceRange, ServiceCategory,
    UrgencyTier, ValidationError, WorkerProfile, PLATFORM_FEE,
};
use serde::{de, Deserialize, Deserializer};
use tokio::sync::Mutex;
use tracing::{info, info_span, warn};
use uuid::Uuid;

pub const CRATE_NAME: &str = "ezw-booking";

pub const BOOKING_QUERY_PARAM: &str = "booking";
pub const SUMMARY_PATH: &str = "/order-summary";
pub const BROWSE_PATH: &str = "/services";

pub const TOKEN_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_MAX_TOKEN_LEN: usize = 4096;
pub const BOOKING_ID_TAG: &str = "EZ";

// Submission

/// Validate a draft and freeze it into a [`BookingRequest`].
///
/// Checks run in a fixed order and the first failure wins: date, time, location,
/// description, then the worker reference, which must exist and be taking bookings.
/// `today` itself is a valid date.
pub fn submit(
    draft: &BookingDraft,
    catalog: &dyn CatalogProvider,
    today: NaiveDate,
) -> Result<BookingRequest, ValidationError> {
    let result = check_draft(draft, catalog, today);
    match &result {
        Ok(request) => info!(
            worker_id = request.worker_id(),
            urgency = %request.urgency(),
            estimated_cost = request.estimated_cost(),
            "booking submitted"
        ),
        Err(err) => warn!(field = %err.field, "booking rejected"),
    }
    result
}

/// [`submit`] against the local calendar date.
pub fn submit_today(
    draft: &BookingDraft,
    catalog: &dyn CatalogProvider,
) -> Result<BookingRequest, ValidationError> {
    submit(draft, catalog, Local::now().date_naive())
}

fn check_draft(
    draft: &BookingDraft,
    catalog: &dyn CatalogProvider,
    today: NaiveDate,
) -> Result<BookingRequest, ValidationError> {
    let date = draft.scheduled_date.ok_or(invalid(BookingField::Date))?;
    if date < today {
        return Err(invalid(BookingField::Date));
    }
    let time = non_blank(draft.scheduled_time.as_deref()).ok_or(invalid(BookingField::Time))?;
    if !is_known_time_slot(time) {
        return Err(invalid(BookingField::Time));
    }
    let location = non_blank(draft.location.as_deref()).ok_or(invalid(BookingField::Location))?;
    let description =
        non_blank(draft.description.as_deref()).ok_or(invalid(BookingField::Description))?;
    let worker_id = non_blank(draft.worker_id.as_deref()).ok_or(invalid(BookingField::Worker))?;
    let worker = catalog
        .get_worker(worker_id)
        .map_err(|_| invalid(BookingField::Worker))?;
    if !worker.available {
        return Err(invalid(BookingField::Worker));
    }

    let urgency = draft.urgency_or_default();
    BookingRequest::try_from_parts(BookingParts {
        worker_id: worker_id.to_string(),
        scheduled_date: date,
        scheduled_time: time.to_string(),
        location: location.to_string(),
        description: description.to_string(),
        urgency,
        estimated_cost: estimate(urgency).to_string(),
    })
}

fn invalid(field: BookingField) -> ValidationError {
    ValidationError { field }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// Transfer codec

/// Percent-encoded booking, safe to place in a single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookingToken(String);

impl BookingToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BookingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    pub max_token_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_token_len: DEFAULT_MAX_TOKEN_LEN,
        }
    }
}

impl CodecConfig {
    pub fn from_env() -> Self {
        Self {
            max_token_len: std::env::var("EZW_MAX_TOKEN_LEN")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|len| *len > 0)
                .unwrap_or(DEFAULT_MAX_TOKEN_LEN),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenEnvelope {
    v: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPayload {
    worker_id: String,
    #[serde(deserialize_with = "deserialize_token_date")]
    date: NaiveDate,
    time: String,
    location: String,
    description: String,
    urgency: UrgencyTier,
    estimated_cost: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransferCodec {
    config: CodecConfig,
}

impl TransferCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> CodecConfig {
        self.config
    }

    /// Fails on the longer free-text field when the token would exceed the decode cap,
    /// so every token handed out here decodes again.
    pub fn encode(&self, request: &BookingRequest) -> Result<BookingToken, ValidationError> {
        let payload = serde_json::json!({
            "v": TOKEN_SCHEMA_VERSION,
            "workerId": request.worker_id(),
            "date": format_token_date(request.scheduled_date()),
            "time": request.scheduled_time(),
            "location": request.location(),
            "description": request.description(),
            "urgency": request.urgency(),
            "estimatedCost": request.estimated_cost(),
        });
        let token = BookingToken(urlencoding::encode(&payload.to_string()).into_owned());
        if token.0.len() > self.config.max_token_len {
            let field = oversized_field(request);
            warn!(
                len = token.0.len(),
                max = self.config.max_token_len,
                %field,
                "booking too large for transfer token"
            );
            return Err(invalid(field));
        }
        info!(len = token.0.len(), worker_id = request.worker_id(), "booking token encoded");
        Ok(token)
    }

    /// Never panics: every failure maps onto a [`DecodeReason`].
    pub fn decode(&self, token: Option<&str>) -> Result<BookingRequest, DecodeError> {
        let result = self.decode_inner(token);
        if let Err(err) = &result {
            warn!(reason = %err.reason, "booking token rejected");
        }
        result
    }

    fn decode_inner(&self, token: Option<&str>) -> Result<BookingRequest, DecodeError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(DecodeError::missing)?;
        if token.len() > self.config.max_token_len {
            return Err(DecodeError::malformed());
        }
        let json = urlencoding::decode(token).map_err(|_| DecodeError::malformed())?;

        let envelope: TokenEnvelope =
            serde_json::from_str(&json).map_err(|_| DecodeError::malformed())?;
        if envelope.v != Some(TOKEN_SCHEMA_VERSION) {
            return Err(DecodeError::version_mismatch());
        }

        let payload: TokenPayload =
            serde_json::from_str(&json).map_err(|_| DecodeError::malformed())?;
        BookingRequest::try_from_parts(BookingParts {
            worker_id: payload.worker_id,
            scheduled_date: payload.date,
            scheduled_time: payload.time,
            location: payload.location,
            description: payload.description,
            urgency: payload.urgency,
            estimated_cost: payload.estimated_cost,
        })
        .map_err(|_| DecodeError::malformed())
    }
}

pub fn encode(request: &BookingRequest) -> Result<BookingToken, ValidationError> {
    TransferCodec::default().encode(request)
}

pub fn decode(token: Option<&str>) -> Result<BookingRequest, DecodeError> {
    TransferCodec::default().decode(token)
}

fn oversized_field(request: &BookingRequest) -> BookingField {
    let location = urlencoding::encode(request.location()).len();
    let description = urlencoding::encode(request.description()).len();
    if location > description {
        BookingField::Location
    } else {
        BookingField::Description
    }
}

/// Canonical timestamp form of a calendar date: midnight UTC, millisecond precision.
pub fn format_token_date(date: NaiveDate) -> String {
    format!("{}T00:00:00.000Z", date.format("%Y-%m-%d"))
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD`.
pub fn parse_token_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn deserialize_token_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_token_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid booking date `{raw}`")))
}

// Navigation boundary

/// Address of the summary screen carrying `token`.
pub fn summary_location(token: &BookingToken) -> String {
    format!("{SUMMARY_PATH}?{BOOKING_QUERY_PARAM}={token}")
}

/// Raw (still percent-encoded) `booking` value from a query string.
pub fn token_from_query(raw_query: Option<&str>) -> Option<&str> {
    raw_query?
        .trim_start_matches('?')
        .split('&')
        .find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key == BOOKING_QUERY_PARAM).then_some(value)
        })
}

// Booking identifiers

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// `EZ` + last six digits of the millisecond clock + a random UUID v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> String {
        let millis = Utc::now().timestamp_millis().rem_euclid(1_000_000);
        format!("{BOOKING_ID_TAG}{millis:06}-{}", Uuid::new_v4().simple())
    }
}

/// Deterministic `EZ000001`, `EZ000002`, ...
#[derive(Debug, Default)]
pub struct SequenceIdGenerator {
    issued: AtomicU64,
}

impl SequenceIdGenerator {
    pub fn starting_after(issued: u64) -> Self {
        Self {
            issued: AtomicU64::new(issued),
        }
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn next_id(&self) -> String {
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{BOOKING_ID_TAG}{n:06}")
    }
}

// Order summary

/// Read-only confirmation view derived from a decoded booking.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfirmation {
    pub booking_id: String,
    pub worker: WorkerProfile,
    pub service: Option<ServiceCategory>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: String,
    pub location: String,
    pub description: String,
    pub urgency: UrgencyTier,
    pub base_cost: String,
    pub platform_fee: u32,
    pub total_cost: Result<PriceRange, ParseError>,
}

impl BookingConfirmation {
    /// Total with the fee applied, or the raw base cost when it could not be parsed.
    pub fn total_cost_display(&self) -> String {
        match &self.total_cost {
            Ok(range) => range.to_string(),
            Err(_) => self.base_cost.clone(),
        }
    }

    pub fn fee_applied(&self) -> bool {
        self.total_cost.is_ok()
    }

    pub fn scheduled_date_display(&self) -> String {
        self.scheduled_date.format("%B %-d, %Y").to_string()
    }

    pub fn service_name(&self) -> &str {
        self.service
            .as_ref()
            .map(|s| s.display_name.as_str())
            .unwrap_or(&self.worker.service_key)
    }
}

/// Lower bound kept, platform fee added to the upper bound.
pub fn total_cost(estimated_cost: &str, platform_fee: u32) -> Result<PriceRange, ParseError> {
    let base: PriceRange = estimated_cost.parse()?;
    Ok(PriceRange::new(base.low, base.high.saturating_add(platform_fee)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    Token(DecodeReason),
    UnknownWorker(String),
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::Token(reason) => write!(f, "booking token {reason}"),
            NotFoundReason::UnknownWorker(id) => write!(f, "worker `{id}` not found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SummaryState {
    #[default]
    Loading,
    Confirmed(Box<BookingConfirmation>),
    NotFound(NotFoundReason),
}

impl SummaryState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SummaryState::Loading)
    }

    /// Where a user lands to recover from a missing booking.
    pub fn recovery_path(&self) -> Option<&'static str> {
        matches!(self, SummaryState::NotFound(_)).then_some(BROWSE_PATH)
    }
}

/// Turns decode outcomes into summary states.
pub struct SummaryRenderer<'a> {
    catalog: &'a dyn CatalogProvider,
    ids: &'a dyn IdGenerator,
    codec: TransferCodec,
}

impl<'a> SummaryRenderer<'a> {
    pub fn new(
        catalog: &'a dyn CatalogProvider,
        ids: &'a dyn IdGenerator,
        codec: TransferCodec,
    ) -> Self {
        Self {
            catalog,
            ids,
            codec,
        }
    }

    pub fn render(&self, token: Option<&str>) -> SummaryState {
        let span = info_span!("order_summary", has_token = token.is_some());
        let _guard = span.enter();
        self.confirm(self.codec.decode(token))
    }

    pub fn confirm(&self, decoded: Result<BookingRequest, DecodeError>) -> SummaryState {
        let request = match decoded {
            Ok(request) => request,
            Err(err) => return SummaryState::NotFound(NotFoundReason::Token(err.reason)),
        };
        let worker = match self.catalog.get_worker(request.worker_id()) {
            Ok(worker) => worker,
            Err(err) => {
                warn!(worker_id = %err.worker_id, "booked worker missing from catalog");
                return SummaryState::NotFound(NotFoundReason::UnknownWorker(err.worker_id));
            }
        };
        let service = self.catalog.service_category(&worker.service_key);
        let parts = request.into_parts();
        let total = total_cost(&parts.estimated_cost, PLATFORM_FEE);
        if let Err(err) = &total {
            warn!(%err, "showing base cost without platform fee");
        }

        let confirmation = BookingConfirmation {
            booking_id: self.ids.next_id(),
            worker,
            service,
            scheduled_date: parts.scheduled_date,
            scheduled_time: parts.scheduled_time,
            location: parts.location,
            description: parts.description,
            urgency: parts.urgency,
            base_cost: parts.estimated_cost,
            platform_fee: PLATFORM_FEE,
            total_cost: total,
        };
        info!(booking_id = %confirmation.booking_id, "booking confirmed");
        SummaryState::Confirmed(Box::new(confirmation))
    }
}

/// Summary view lifecycle: `Loading` resolves once into `Confirmed` or `NotFound`.
#[derive(Debug, Default)]
pub struct OrderSummary {
    state: SummaryState,
}

impl OrderSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SummaryState {
        &self.state
    }

    pub fn into_state(self) -> SummaryState {
        self.state
    }

    /// No-op once the summary has reached a terminal state.
    pub fn resolve(&mut self, renderer: &SummaryRenderer<'_>, token: Option<&str>) -> &SummaryState {
        if !self.state.is_terminal() {
            self.state = renderer.render(token);
        }
        &self.state
    }
}

// Clipboard

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, value: &str) -> Result<(), ClipboardError>;
}

/// Keeps the last written value in memory.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub async fn contents(&self) -> Option<String> {
        self.contents.lock().await.clone()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, value: &str) -> Result<(), ClipboardError> {
        *self.contents.lock().await = Some(value.to_string());
        Ok(())
    }
}

/// Rejects every write, as a browser does without clipboard permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedClipboard;

#[async_trait]
impl Clipboard for DeniedClipboard {
    async fn write_text(&self, _value: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::PermissionDenied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyNotice {
    Copied { booking_id: String },
    Failed { reason: String },
}

impl CopyNotice {
    pub fn title(&self) -> &'static str {
        match self {
            CopyNotice::Copied { .. } => "Booking ID Copied",
            CopyNotice::Failed { .. } => "Could not copy Booking ID",
        }
    }

    pub fn description(&self) -> String {
        match self {
            CopyNotice::Copied { .. } => "Booking ID has been copied to clipboard".to_string(),
            CopyNotice::Failed { reason } => reason.clone(),
        }
    }
}

/// Clipboard failures come back as a notice, never as an error.
pub async fn copy_booking_id(clipboard: &dyn Clipboard, booking_id: &str) -> CopyNotice {
    match clipboard.write_text(booking_id).await {
        Ok(()) => CopyNotice::Copied {
            booking_id: booking_id.to_string(),
        },
        Err(err) => {
            warn!(%err, booking_id, "clipboard write failed");
            CopyNotice::Failed {
                reason: err.to_string(),
            }
        }
    }
}
