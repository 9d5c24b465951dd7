//! Core domain model, cost estimation and error kinds for EZW.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CRATE_NAME: &str = "ezw-core";

/// Fixed charge added on top of every service estimate.
pub const PLATFORM_FEE: u32 = 50;

/// Bookable time-slot labels, in display order.
pub const TIME_SLOTS: [&str; 11] = [
    "09:00 AM", "10:00 AM", "11:00 AM", "12:00 PM", "01:00 PM", "02:00 PM", "03:00 PM",
    "04:00 PM", "05:00 PM", "06:00 PM", "07:00 PM",
];

pub fn is_known_time_slot(label: &str) -> bool {
    TIME_SLOTS.contains(&label)
}

/// A browsable category of service, e.g. `electrician`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCategory {
    pub key: String,
    pub display_name: String,
    pub description: String,
}

/// Read-only worker listing as exposed by a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub id: String,
    pub name: String,
    pub service_key: String,
    pub rating: f32,
    pub experience_years: u32,
    pub location: String,
    pub price_range: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub available: bool,
    pub verified: bool,
    #[serde(default)]
    pub phone: Option<String>,
}

/// How soon the customer needs the work done. Ordered by severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyTier {
    Low,
    #[default]
    Medium,
    High,
    Emergency,
}

impl UrgencyTier {
    pub const ALL: [UrgencyTier; 4] = [
        UrgencyTier::Low,
        UrgencyTier::Medium,
        UrgencyTier::High,
        UrgencyTier::Emergency,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UrgencyTier::Low => "low",
            UrgencyTier::Medium => "medium",
            UrgencyTier::High => "high",
            UrgencyTier::Emergency => "emergency",
        }
    }
}

impl fmt::Display for UrgencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UrgencyTier {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        UrgencyTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == normalized)
            .ok_or_else(|| ConfigurationError::UnknownUrgency(s.to_string()))
    }
}

/// Closed price range in currency units per hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub low: u32,
    pub high: u32,
}

impl PriceRange {
    pub const fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

impl FromStr for PriceRange {
    type Err = ParseError;

    /// Accepts `"<low>-<high>"`, tolerating whitespace and a leading `₹` on either bound.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseError {
            input: s.to_string(),
        };
        let (low, high) = s.trim().split_once('-').ok_or_else(err)?;
        let low = parse_bound(low).ok_or_else(err)?;
        let high = parse_bound(high).ok_or_else(err)?;
        if low > high {
            return Err(err());
        }
        Ok(Self { low, high })
    }
}

fn parse_bound(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let raw = raw.strip_prefix('₹').unwrap_or(raw).trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Hourly price range for an urgency tier.
pub fn estimate(urgency: UrgencyTier) -> PriceRange {
    match urgency {
        UrgencyTier::Low => PriceRange::new(400, 600),
        UrgencyTier::Medium => PriceRange::new(500, 800),
        UrgencyTier::High => PriceRange::new(700, 1000),
        UrgencyTier::Emergency => PriceRange::new(1000, 1500),
    }
}

/// Estimate from a textual tier. Unknown tiers fail instead of falling back to a default.
pub fn estimate_label(label: &str) -> Result<PriceRange, ConfigurationError> {
    Ok(estimate(label.parse()?))
}

/// User-editable fields of a booking, named for field-level error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingField {
    Worker,
    Date,
    Time,
    Location,
    Description,
}

impl BookingField {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingField::Worker => "worker",
            BookingField::Date => "date",
            BookingField::Time => "time",
            BookingField::Location => "location",
            BookingField::Description => "description",
        }
    }
}

impl fmt::Display for BookingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partially-filled booking as collected from the form, one field at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingDraft {
    pub worker_id: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub urgency: Option<UrgencyTier>,
}

impl BookingDraft {
    pub fn for_worker(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: Some(worker_id.into()),
            ..Self::default()
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.scheduled_date = Some(date);
        self
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.scheduled_time = Some(time.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_urgency(mut self, urgency: UrgencyTier) -> Self {
        self.urgency = Some(urgency);
        self
    }

    pub fn urgency_or_default(&self) -> UrgencyTier {
        self.urgency.unwrap_or_default()
    }
}

/// Plain field bundle used to assemble a [`BookingRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingParts {
    pub worker_id: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: String,
    pub location: String,
    pub description: String,
    pub urgency: UrgencyTier,
    pub estimated_cost: String,
}

/// A submitted booking. Fields are frozen once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    worker_id: String,
    scheduled_date: NaiveDate,
    scheduled_time: String,
    location: String,
    description: String,
    urgency: UrgencyTier,
    estimated_cost: String,
}

impl BookingRequest {
    /// Enforces the structural invariant: every required text field is non-blank.
    /// Checked in time, location, description, worker order.
    pub fn try_from_parts(parts: BookingParts) -> Result<Self, ValidationError> {
        let checks = [
            (BookingField::Time, &parts.scheduled_time),
            (BookingField::Location, &parts.location),
            (BookingField::Description, &parts.description),
            (BookingField::Worker, &parts.worker_id),
        ];
        if let Some((field, _)) = checks.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ValidationError { field: *field });
        }
        Ok(Self {
            worker_id: parts.worker_id,
            scheduled_date: parts.scheduled_date,
            scheduled_time: parts.scheduled_time,
            location: parts.location,
            description: parts.description,
            urgency: parts.urgency,
            estimated_cost: parts.estimated_cost,
        })
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn scheduled_date(&self) -> NaiveDate {
        self.scheduled_date
    }

    pub fn scheduled_time(&self) -> &str {
        &self.scheduled_time
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn urgency(&self) -> UrgencyTier {
        self.urgency
    }

    pub fn estimated_cost(&self) -> &str {
        &self.estimated_cost
    }

    pub fn into_parts(self) -> BookingParts {
        BookingParts {
            worker_id: self.worker_id,
            scheduled_date: self.scheduled_date,
            scheduled_time: self.scheduled_time,
            location: self.location,
            description: self.description,
            urgency: self.urgency,
            estimated_cost: self.estimated_cost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("booking field `{field}` is missing or invalid")]
pub struct ValidationError {
    pub field: BookingField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecodeReason {
    Missing,
    Malformed,
    VersionMismatch,
}

impl fmt::Display for DecodeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecodeReason::Missing => "missing",
            DecodeReason::Malformed => "malformed",
            DecodeReason::VersionMismatch => "versionMismatch",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("booking token rejected: {reason}")]
pub struct DecodeError {
    pub reason: DecodeReason,
}

impl DecodeError {
    pub fn missing() -> Self {
        Self {
            reason: DecodeReason::Missing,
        }
    }

    pub fn malformed() -> Self {
        Self {
            reason: DecodeReason::Malformed,
        }
    }

    pub fn version_mismatch() -> Self {
        Self {
            reason: DecodeReason::VersionMismatch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cost `{input}` is not a `<low>-<high>` range")]
pub struct ParseError {
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    #[error("clipboard permission denied")]
    PermissionDenied,
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

/// Deployment defects. Fatal at startup, never a user-facing request error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("unrecognized urgency tier `{0}`")]
    UnknownUrgency(String),
    #[error("missing label `{0}`")]
    MissingLabel(String),
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("worker `{worker_id}` not found")]
pub struct NotFoundError {
    pub worker_id: String,
}
