use serde::Deserialize;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::query::ViewQuery;

fn default_page_size() -> usize {
    100
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Connection and paging settings, usually loaded from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    /// Base URL of the server, e.g. `http://localhost:5984`.
    pub server: String,
    pub database: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub include_docs: bool,
    #[serde(default)]
    pub query: Option<ViewQuery>,
}

impl ViewConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ViewConfig = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(Error::Config("server must not be empty".into()));
        }
        if self.database.is_empty() {
            return Err(Error::Config("database must not be empty".into()));
        }
        if self.page_size == 0 {
            return Err(Error::InvalidPageSize(self.page_size));
        }
        Ok(())
    }

    /// Server URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.server.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// The configured query with `include_docs` applied, or `_all_docs` when
    /// no query is configured.
    pub fn view_query(&self) -> ViewQuery {
        let query = self.query.clone().unwrap_or_else(ViewQuery::all_docs);
        if self.include_docs {
            query.include_docs(true)
        } else {
            query
        }
    }

    /// Full request URL for one page.
    pub fn url_for(&self, path: &str, params: &[(String, String)]) -> String {
        if params.is_empty() {
            format!("{}{path}", self.base_url())
        } else {
            format!("{}{path}?{}", self.base_url(), crate::query::query_string(params))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ViewTarget;

    #[test]
    fn parse_minimal() {
        let json = r#"{
            "server": "http://localhost:5984/",
            "database": "library"
        }"#;
        let cfg = ViewConfig::from_json(json).unwrap();
        assert_eq!(cfg.base_url(), "http://localhost:5984");
        assert_eq!(cfg.page_size, 100);
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.view_query().target, ViewTarget::AllDocs);
    }

    #[test]
    fn parse_with_view_query() {
        let json = r#"{
            "server": "http://couch:5984",
            "database": "library",
            "page_size": 25,
            "request_timeout_ms": 5000,
            "include_docs": true,
            "query": {
                "target": {"type": "view", "design": "books", "view": "by_author"},
                "descending": true
            }
        }"#;
        let cfg = ViewConfig::from_json(json).unwrap();
        assert_eq!(cfg.page_size, 25);
        let q = cfg.view_query();
        assert!(q.include_docs);
        assert!(q.descending);
        assert_eq!(q.path(&cfg.database), "/library/_design/books/_view/by_author");
    }

    #[test]
    fn url_for_appends_query_string() {
        let cfg = ViewConfig::from_json(r#"{"server": "http://h:5984", "database": "db"}"#).unwrap();
        let params = vec![("limit".to_string(), "11".to_string())];
        assert_eq!(cfg.url_for("/db/_all_docs", &params), "http://h:5984/db/_all_docs?limit=11");
        assert_eq!(cfg.url_for("/db/_all_docs", &[]), "http://h:5984/db/_all_docs");
    }

    #[test]
    fn rejects_zero_page_size() {
        let json = r#"{"server": "http://h", "database": "db", "page_size": 0}"#;
        assert!(matches!(ViewConfig::from_json(json), Err(Error::InvalidPageSize(0))));
    }

    #[test]
    fn rejects_empty_database() {
        let json = r#"{"server": "http://h", "database": ""}"#;
        assert!(matches!(ViewConfig::from_json(json), Err(Error::Config(_))));
    }

    #[test]
    fn invalid_json_returns_error() {
        let result = ViewConfig::from_json("not json");
        assert!(result.is_err());
    }
}
