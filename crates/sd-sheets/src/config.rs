use serde::Deserialize;

use crate::error::{StoreError, StoreResult};

/// Spreadsheet connection and layout settings, loadable from TOML or environment.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    /// Spreadsheet ID. None runs against the in-memory store.
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    /// OAuth bearer token for the Sheets API.
    #[serde(default)]
    pub access_token: Option<String>,
    /// API base URL (overridden in tests).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Tab holding the services catalog.
    #[serde(default = "default_services_tab")]
    pub services_tab: String,
    /// Tab holding appointment rows.
    #[serde(default = "default_appointments_tab")]
    pub appointments_tab: String,
    /// A1 range of the knowledge table indexed for Q&A.
    #[serde(default = "default_knowledge_range")]
    pub knowledge_range: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://sheets.googleapis.com".into()
}
fn default_services_tab() -> String {
    "Services".into()
}
fn default_appointments_tab() -> String {
    "Appointments".into()
}
fn default_knowledge_range() -> String {
    "Business Hours!A1:Z".into()
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            access_token: None,
            base_url: default_base_url(),
            services_tab: default_services_tab(),
            appointments_tab: default_appointments_tab(),
            knowledge_range: default_knowledge_range(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SheetsConfig {
    /// Overlay environment variables onto the defaults.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            spreadsheet_id: var("SPREADSHEET_ID"),
            access_token: var("SHEETS_ACCESS_TOKEN"),
            base_url: var("SHEETS_BASE_URL").unwrap_or(defaults.base_url),
            services_tab: var("SERVICES_TAB").unwrap_or(defaults.services_tab),
            appointments_tab: var("APPOINTMENTS_TAB").unwrap_or(defaults.appointments_tab),
            knowledge_range: var("SHEETS_RANGE").unwrap_or(defaults.knowledge_range),
            timeout_secs: var("SHEETS_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    /// Whether a real spreadsheet is configured.
    pub fn is_remote(&self) -> bool {
        self.spreadsheet_id.is_some()
    }

    /// Fail fast when a spreadsheet is configured without credentials.
    pub fn validate(&self) -> StoreResult<()> {
        if self.spreadsheet_id.is_some() && self.access_token.is_none() {
            return Err(StoreError::Config(
                "SHEETS_ACCESS_TOKEN is required when SPREADSHEET_ID is set".into(),
            ));
        }
        Ok(())
    }

    /// Range covering every column of a tab.
    pub fn tab_range(tab: &str) -> String {
        format!("{tab}!A1:Z")
    }
}
