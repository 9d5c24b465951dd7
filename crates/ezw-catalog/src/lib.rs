//! Catalog provider contracts + YAML-backed catalog and label fixtures.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ezw_core::{ConfigurationError, NotFoundError, ServiceCategory, WorkerProfile};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::info;

pub const CRATE_NAME: &str = "ezw-catalog";

pub const CATALOG_FILE: &str = "catalog.yaml";
pub const LABELS_FILE: &str = "labels.yaml";

/// Label keys the front end renders. All must resolve before the server starts.
pub const REQUIRED_LABELS: &[&str] = &[
    "app.name",
    "nav.home",
    "nav.services",
    "nav.workers",
    "home.title",
    "home.subtitle",
    "services.title",
    "services.subtitle",
    "services.search",
    "services.find_workers",
    "workers.title",
    "workers.subtitle",
    "workers.all",
    "workers.years",
    "workers.skills",
    "workers.book_now",
    "workers.unavailable",
    "booking.title",
    "booking.subtitle",
    "booking.select_date",
    "booking.select_time",
    "booking.location",
    "booking.description",
    "booking.urgency",
    "booking.low",
    "booking.medium",
    "booking.high",
    "booking.emergency",
    "booking.estimated_cost",
    "booking.confirm",
    "booking.cancel",
    "errors.worker",
    "errors.date",
    "errors.time",
    "errors.location",
    "errors.description",
    "errors.too_long",
    "errors.unavailable",
    "order_summary.title",
    "order_summary.subtitle",
    "order_summary.booking_id",
    "order_summary.copy",
    "order_summary.confirmed",
    "order_summary.worker_details",
    "order_summary.service_details",
    "order_summary.booking_details",
    "order_summary.date",
    "order_summary.time",
    "order_summary.location",
    "order_summary.urgency",
    "order_summary.work_description",
    "order_summary.service_cost",
    "order_summary.platform_fee",
    "order_summary.total_cost",
    "order_summary.status",
    "order_summary.contact_notice",
    "order_summary.not_found",
    "order_summary.browse_services",
];

/// Read-only source of service categories and worker profiles.
pub trait CatalogProvider: Send + Sync {
    fn list_service_categories(&self) -> Vec<ServiceCategory>;

    /// Workers offering `service_key`, or every worker when no filter is given.
    fn list_workers(&self, service_key: Option<&str>) -> Vec<WorkerProfile>;

    fn get_worker(&self, id: &str) -> Result<WorkerProfile, NotFoundError>;

    fn service_category(&self, key: &str) -> Option<ServiceCategory> {
        self.list_service_categories()
            .into_iter()
            .find(|s| s.key == key)
    }

    /// Case-insensitive substring match on display name or description.
    fn search_service_categories(&self, query: &str) -> Vec<ServiceCategory> {
        let needle = query.trim().to_lowercase();
        self.list_service_categories()
            .into_iter()
            .filter(|s| {
                needle.is_empty()
                    || s.display_name.to_lowercase().contains(&needle)
                    || s.description.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    services: Vec<ServiceCategory>,
    #[serde(default)]
    workers: Vec<WorkerProfile>,
}

/// In-memory catalog, typically loaded from `catalog.yaml`.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    services: Vec<ServiceCategory>,
    workers: Vec<WorkerProfile>,
}

impl StaticCatalog {
    pub fn new(
        services: Vec<ServiceCategory>,
        workers: Vec<WorkerProfile>,
    ) -> Result<Self, ConfigurationError> {
        let mut service_keys = HashSet::new();
        for service in &services {
            if !service_keys.insert(service.key.as_str()) {
                return Err(ConfigurationError::InvalidCatalog(format!(
                    "duplicate service key `{}`",
                    service.key
                )));
            }
        }

        let mut worker_ids = HashSet::new();
        for worker in &workers {
            if !worker_ids.insert(worker.id.as_str()) {
                return Err(ConfigurationError::InvalidCatalog(format!(
                    "duplicate worker id `{}`",
                    worker.id
                )));
            }
            if !service_keys.contains(worker.service_key.as_str()) {
                return Err(ConfigurationError::InvalidCatalog(format!(
                    "worker `{}` references unknown service `{}`",
                    worker.id, worker.service_key
                )));
            }
            if !(0.0..=5.0).contains(&worker.rating) {
                return Err(ConfigurationError::InvalidCatalog(format!(
                    "worker `{}` rating {} outside 0-5",
                    worker.id, worker.rating
                )));
            }
        }

        Ok(Self { services, workers })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml).context("parsing catalog yaml")?;
        Ok(Self::new(file.services, file.workers)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file: CatalogFile = read_yaml_file(path)?;
        let catalog = Self::new(file.services, file.workers)
            .with_context(|| format!("validating {}", path.display()))?;
        info!(
            path = %path.display(),
            services = catalog.services.len(),
            workers = catalog.workers.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn from_workspace_root(root: &Path) -> Result<Self> {
        Self::load(root.join(CATALOG_FILE))
    }
}

impl CatalogProvider for StaticCatalog {
    fn list_service_categories(&self) -> Vec<ServiceCategory> {
        self.services.clone()
    }

    fn list_workers(&self, service_key: Option<&str>) -> Vec<WorkerProfile> {
        self.workers
            .iter()
            .filter(|w| service_key.map_or(true, |key| w.service_key == key))
            .cloned()
            .collect()
    }

    fn get_worker(&self, id: &str) -> Result<WorkerProfile, NotFoundError> {
        self.workers
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| NotFoundError {
                worker_id: id.to_string(),
            })
    }
}

/// Key → display string lookup for UI text.
#[derive(Debug, Clone, Default)]
pub struct Labels {
    entries: BTreeMap<String, String>,
}

impl Labels {
    pub fn from_map(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let entries = serde_yaml::from_str(yaml).context("parsing labels yaml")?;
        Ok(Self { entries })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            entries: read_yaml_file(path)?,
        })
    }

    pub fn from_workspace_root(root: &Path) -> Result<Self> {
        Self::load(root.join(LABELS_FILE))
    }

    pub fn lookup(&self, key: &str) -> Result<&str, ConfigurationError> {
        self.entries
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ConfigurationError::MissingLabel(key.to_string()))
    }

    /// Fails on the first key that does not resolve.
    pub fn require(&self, keys: &[&str]) -> Result<(), ConfigurationError> {
        keys.iter().try_for_each(|key| self.lookup(key).map(|_| ()))
    }

    /// Lookup for rendering after [`Labels::require`] has passed; echoes the key if absent.
    pub fn text<'a>(&'a self, key: &'a str) -> &'a str {
        self.lookup(key).unwrap_or(key)
    }
}

fn read_yaml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn workspace_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .canonicalize()
            .expect("workspace root")
    }

    fn fixture_catalog() -> StaticCatalog {
        StaticCatalog::from_workspace_root(&workspace_root()).expect("catalog fixture")
    }

    #[test]
    fn fixture_catalog_lists_services_in_order() {
        let keys = fixture_catalog()
            .list_service_categories()
            .into_iter()
            .map(|s| s.key)
            .collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![
                "electrician",
                "plumber",
                "carpenter",
                "painter",
                "cleaner",
                "laborer",
                "mechanic",
                "gardener"
            ]
        );
    }

    #[test]
    fn list_workers_filters_by_service() {
        let catalog = fixture_catalog();
        assert_eq!(catalog.list_workers(None).len(), 4);
        let plumbers = catalog.list_workers(Some("plumber"));
        assert_eq!(plumbers.len(), 1);
        assert_eq!(plumbers[0].name, "Suresh Sharma");
        assert!(catalog.list_workers(Some("gardener")).is_empty());
    }

    #[test]
    fn get_worker_reports_missing_ids() {
        let catalog = fixture_catalog();
        assert_eq!(catalog.get_worker("1").unwrap().service_key, "electrician");
        assert_eq!(
            catalog.get_worker("99").unwrap_err(),
            NotFoundError {
                worker_id: "99".into()
            }
        );
    }

    #[test]
    fn search_matches_name_or_description_case_insensitively() {
        let catalog = fixture_catalog();
        let hits = catalog.search_service_categories("PLUMB");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "plumber");
        assert_eq!(catalog.search_service_categories("  ").len(), 8);
        assert!(catalog.search_service_categories("astronaut").is_empty());
    }

    #[test]
    fn rejects_worker_with_unknown_service() {
        let yaml = r#"
services:
  - key: plumber
    display_name: Plumber
    description: Pipes
workers:
  - id: "1"
    name: Someone
    service_key: welder
    rating: 4.0
    experience_years: 2
    location: Somewhere
    price_range: "₹100-200/hour"
    available: true
    verified: false
"#;
        let err = StaticCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown service"), "{err}");
    }

    #[test]
    fn load_reports_path_on_bad_yaml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CATALOG_FILE);
        fs::write(&path, "services: [").expect("write");
        let err = StaticCatalog::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }

    #[test]
    fn fixture_labels_cover_required_keys() {
        let labels = Labels::from_workspace_root(&workspace_root()).expect("labels fixture");
        labels.require(REQUIRED_LABELS).expect("all labels present");
        assert_eq!(labels.lookup("order_summary.not_found").unwrap(), "No Booking Found");
    }

    #[test]
    fn require_names_first_missing_label() {
        let labels = Labels::from_yaml_str("app.name: EZ Work\n").unwrap();
        assert_eq!(
            labels.require(&["app.name", "booking.title", "booking.confirm"]),
            Err(ConfigurationError::MissingLabel("booking.title".into()))
        );
        assert_eq!(labels.text("booking.title"), "booking.title");
    }
}
