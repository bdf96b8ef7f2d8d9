//! Web search service configuration: parsing and validation of the persisted
//! service list.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Placeholder replaced by the encoded query
pub const QUERY_PLACEHOLDER: &str = "%s";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchService {
    pub id: String,
    pub name: String,
    pub url_template: String,
    pub enabled: bool,
    pub keyword: String,
}

impl WebSearchService {
    /// Fill the template with the percent-encoded query.
    pub fn search_url(&self, query: &str) -> String {
        self.url_template
            .replace(QUERY_PLACEHOLDER, &urlencoding::encode(query))
    }
}

/// Built-in services used when the configured set is empty or unusable.
pub fn default_services() -> Vec<WebSearchService> {
    vec![
        WebSearchService {
            id: "google".to_string(),
            name: "Google".to_string(),
            url_template: "https://www.google.com/search?q=%s".to_string(),
            enabled: true,
            keyword: "g".to_string(),
        },
        WebSearchService {
            id: "duckduckgo".to_string(),
            name: "DuckDuckGo".to_string(),
            url_template: "https://duckduckgo.com/?q=%s".to_string(),
            enabled: true,
            keyword: "ddg".to_string(),
        },
    ]
}

/// Why a service row was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRejection {
    NameMissing,
    TemplateMissingPlaceholder,
    TemplateInvalidUrl,
    TemplateNonHttps,
}

impl ServiceRejection {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceRejection::NameMissing => "name-missing",
            ServiceRejection::TemplateMissingPlaceholder => "template-missing-placeholder",
            ServiceRejection::TemplateInvalidUrl => "template-invalid-url",
            ServiceRejection::TemplateNonHttps => "template-non-https",
        }
    }
}

fn string_field<'a>(row: &'a Value, keys: &[&str]) -> &'a str {
    keys.iter()
        .find_map(|key| {
            row.get(*key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or("")
}

fn slug_from_name(name: &str, position: usize) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        format!("service-{}", position + 1)
    } else {
        slug
    }
}

/// Validate one row. `position` only feeds the fallback id.
pub fn validate_service(row: &Value, position: usize) -> Result<WebSearchService, ServiceRejection> {
    let name = string_field(row, &["name"]);
    if name.is_empty() {
        return Err(ServiceRejection::NameMissing);
    }

    let url_template = string_field(row, &["urlTemplate", "url", "template"]);
    if !url_template.contains(QUERY_PLACEHOLDER) {
        return Err(ServiceRejection::TemplateMissingPlaceholder);
    }

    let probe = url_template.replace(QUERY_PLACEHOLDER, "query");
    let parsed = Url::parse(&probe).map_err(|_| ServiceRejection::TemplateInvalidUrl)?;
    if parsed.scheme() != "https" {
        return Err(ServiceRejection::TemplateNonHttps);
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ServiceRejection::TemplateInvalidUrl);
    }

    let id = match string_field(row, &["id"]) {
        "" => slug_from_name(name, position),
        id => id.to_string(),
    };

    Ok(WebSearchService {
        id,
        name: name.to_string(),
        url_template: url_template.to_string(),
        enabled: row.get("enabled").and_then(Value::as_bool).unwrap_or(true),
        keyword: string_field(row, &["keyword"]).to_string(),
    })
}

/// Parse the persisted service list. Invalid rows are dropped. When nothing
/// valid remains the built-in defaults are returned if `fallback_to_defaults`.
pub fn parse_services(raw: &str, fallback_to_defaults: bool) -> Vec<WebSearchService> {
    let fallback = || {
        if fallback_to_defaults {
            default_services()
        } else {
            Vec::new()
        }
    };

    let rows: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Web search config is not valid JSON");
            return fallback();
        }
    };
    let Some(rows) = rows.as_array() else {
        warn!("Web search config is not an array");
        return fallback();
    };

    let mut valid = Vec::new();
    for (position, row) in rows.iter().enumerate() {
        match validate_service(row, position) {
            Ok(service) => valid.push(service),
            Err(reason) => debug!(position, reason = reason.as_str(), "Dropped web search service"),
        }
    }

    if valid.is_empty() {
        fallback()
    } else {
        valid
    }
}

pub fn filter_enabled(services: Vec<WebSearchService>) -> Vec<WebSearchService> {
    services.into_iter().filter(|s| s.enabled).collect()
}

/// Host (with port when present) shown as the secondary text of a row.
pub fn display_host(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}
