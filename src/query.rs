use serde::{Deserialize, Serialize};

use crate::codec::JsonCodec;
use crate::error::{Error, Result};
use crate::row::RowReference;

// ── Query target ─────────────────────────────────────────────

/// Which index a query reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ViewTarget {
    #[serde(rename = "view")]
    View { design: String, view: String },
    #[serde(rename = "all_docs")]
    AllDocs,
}

// ── View query ───────────────────────────────────────────────

/// Options for one view, shared by every page fetched from it.
///
/// Can be built in code or deserialized from JSON alongside the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewQuery {
    pub target: ViewTarget,
    #[serde(default)]
    pub include_docs: bool,
    #[serde(default)]
    pub reduce: Option<bool>,
    #[serde(default)]
    pub group: bool,
    #[serde(default)]
    pub group_level: Option<u32>,
    #[serde(default)]
    pub descending: bool,
    /// Where the first page starts. Later pages start at the cursor instead.
    #[serde(default)]
    pub start_key: Option<serde_json::Value>,
    #[serde(default)]
    pub start_key_doc_id: Option<String>,
    #[serde(default)]
    pub end_key: Option<serde_json::Value>,
    #[serde(default)]
    pub end_key_doc_id: Option<String>,
    #[serde(default)]
    pub inclusive_end: Option<bool>,
    #[serde(default)]
    pub update_seq: bool,
    #[serde(default)]
    pub conflicts: bool,
}

impl ViewQuery {
    fn with_target(target: ViewTarget) -> Self {
        Self {
            target,
            include_docs: false,
            reduce: None,
            group: false,
            group_level: None,
            descending: false,
            start_key: None,
            start_key_doc_id: None,
            end_key: None,
            end_key_doc_id: None,
            inclusive_end: None,
            update_seq: false,
            conflicts: false,
        }
    }

    pub fn view(design: impl Into<String>, view: impl Into<String>) -> Self {
        Self::with_target(ViewTarget::View {
            design: design.into(),
            view: view.into(),
        })
    }

    pub fn all_docs() -> Self {
        Self::with_target(ViewTarget::AllDocs)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid view query JSON: {e}")))
    }

    pub fn include_docs(mut self, include: bool) -> Self {
        self.include_docs = include;
        self
    }

    pub fn reduce(mut self, reduce: bool) -> Self {
        self.reduce = Some(reduce);
        self
    }

    pub fn group(mut self, group: bool) -> Self {
        self.group = group;
        self
    }

    pub fn group_level(mut self, level: u32) -> Self {
        self.group_level = Some(level);
        self
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    pub fn start_key<K: Serialize>(mut self, key: &K) -> Result<Self> {
        self.start_key = Some(to_value(key)?);
        Ok(self)
    }

    pub fn end_key<K: Serialize>(mut self, key: &K) -> Result<Self> {
        self.end_key = Some(to_value(key)?);
        Ok(self)
    }

    /// Doc id tie-breaker for the initial start key.
    pub fn start_key_doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.start_key_doc_id = Some(doc_id.into());
        self
    }

    pub fn end_key_doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.end_key_doc_id = Some(doc_id.into());
        self
    }

    pub fn conflicts(mut self, conflicts: bool) -> Self {
        self.conflicts = conflicts;
        self
    }

    pub fn inclusive_end(mut self, inclusive: bool) -> Self {
        self.inclusive_end = Some(inclusive);
        self
    }

    pub fn update_seq(mut self, update_seq: bool) -> Self {
        self.update_seq = update_seq;
        self
    }

    /// True if the server will reduce the rows, i.e. pages carry no counts.
    /// Unknown for views with a reduce function and no explicit `reduce`.
    pub fn is_reduced(&self) -> Option<bool> {
        match self.target {
            ViewTarget::AllDocs => Some(false),
            ViewTarget::View { .. } => self.reduce,
        }
    }

    /// Request path relative to the server root, names URL-encoded.
    pub fn path(&self, database: &str) -> String {
        let db = urlencoding::encode(database);
        match &self.target {
            ViewTarget::View { design, view } => format!(
                "/{db}/_design/{}/_view/{}",
                urlencoding::encode(design),
                urlencoding::encode(view)
            ),
            ViewTarget::AllDocs => format!("/{db}/_all_docs"),
        }
    }

    /// Query parameters for one page: `limit` rows starting at `cursor`,
    /// or at the configured start key when there is no cursor yet.
    pub fn params<C, K>(
        &self,
        codec: &C,
        cursor: Option<&RowReference<K>>,
        limit: usize,
    ) -> Result<Vec<(String, String)>>
    where
        C: JsonCodec,
        K: Serialize,
    {
        let mut params: Vec<(String, String)> = vec![("limit".into(), limit.to_string())];

        match cursor {
            Some(cursor) => {
                params.push(("startkey".into(), codec.encode_query_value(&cursor.key)?));
                if let Some(doc_id) = cursor.doc_id() {
                    params.push(("startkey_docid".into(), doc_id.to_string()));
                }
            }
            None => {
                if let Some(ref key) = self.start_key {
                    params.push(("startkey".into(), codec.encode_query_value(key)?));
                }
                if let Some(ref doc_id) = self.start_key_doc_id {
                    params.push(("startkey_docid".into(), doc_id.clone()));
                }
            }
        }

        if let Some(ref key) = self.end_key {
            params.push(("endkey".into(), codec.encode_query_value(key)?));
        }
        if let Some(ref doc_id) = self.end_key_doc_id {
            params.push(("endkey_docid".into(), doc_id.clone()));
        }
        if let Some(inclusive) = self.inclusive_end {
            params.push(("inclusive_end".into(), inclusive.to_string()));
        }
        if self.descending {
            params.push(("descending".into(), "true".into()));
        }
        if self.include_docs {
            params.push(("include_docs".into(), "true".into()));
        }
        if let Some(reduce) = self.reduce {
            params.push(("reduce".into(), reduce.to_string()));
        }
        if self.group {
            params.push(("group".into(), "true".into()));
        }
        if let Some(level) = self.group_level {
            params.push(("group_level".into(), level.to_string()));
        }
        if self.update_seq {
            params.push(("update_seq".into(), "true".into()));
        }
        if self.conflicts {
            params.push(("conflicts".into(), "true".into()));
        }

        Ok(params)
    }
}

fn to_value<K: Serialize>(key: &K) -> Result<serde_json::Value> {
    serde_json::to_value(key).map_err(|e| Error::Encode(format!("Invalid key: {e}")))
}

/// Render parameters as a URL query string (without the leading `?`).
pub fn query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
