use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::collate::ViewKey;

// ── Row identity ─────────────────────────────────────────────

/// The position of a single view row: its key plus the id of the document
/// that emitted it. This is the pagination cursor token.
///
/// Reduced rows have no document behind them, so `doc_id` is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowReference<K> {
    pub key: K,
    #[serde(rename = "docId", default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
}

impl<K> RowReference<K> {
    pub fn new(key: K, doc_id: Option<String>) -> Self {
        Self { key, doc_id }
    }

    pub fn doc_id(&self) -> Option<&str> {
        self.doc_id.as_deref()
    }
}

impl<K: ViewKey> RowReference<K> {
    /// Order by key collation, then by document id. A missing id sorts first.
    pub fn collate(&self, other: &Self) -> Ordering {
        self.key
            .collate(&other.key)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

impl<K: ViewKey> PartialEq for RowReference<K> {
    fn eq(&self, other: &Self) -> bool {
        self.collate(other) == Ordering::Equal
    }
}

impl<K: ViewKey> PartialOrd for RowReference<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.collate(other))
    }
}

impl<K: fmt::Debug> fmt::Display for RowReference<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "key={:?}, docId={}",
            self.key,
            self.doc_id.as_deref().unwrap_or("null")
        )
    }
}

/// Render an optional cursor for log lines.
pub fn describe<K: fmt::Debug>(cursor: Option<&RowReference<K>>) -> String {
    match cursor {
        Some(c) => c.to_string(),
        None => "null".to_string(),
    }
}

/// Anything that can report where it sits in a view: its key and doc id.
///
/// The paging iterator only ever looks at this; callers can implement it on
/// their own `Deserialize` row types.
pub trait RowIdentity {
    type Key: ViewKey + Clone;

    fn key(&self) -> &Self::Key;

    fn doc_id(&self) -> Option<&str>;

    fn row_reference(&self) -> RowReference<Self::Key> {
        RowReference::new(self.key().clone(), self.doc_id().map(str::to_owned))
    }
}

/// A row that may carry the emitting document (`include_docs=true`).
pub trait DocumentRow {
    type Doc;

    fn doc(&self) -> Option<&Self::Doc>;
}

impl<K: ViewKey + Clone> RowIdentity for RowReference<K> {
    type Key = K;

    fn key(&self) -> &K {
        &self.key
    }

    fn doc_id(&self) -> Option<&str> {
        self.doc_id.as_deref()
    }
}

// ── Non-reduced view rows ────────────────────────────────────

/// One row of a map-only view query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRow<K, V = serde_json::Value, D = serde_json::Value> {
    pub id: String,
    pub key: K,
    pub value: V,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<D>,
}

impl<K: ViewKey + Clone, V, D> RowIdentity for ViewRow<K, V, D> {
    type Key = K;

    fn key(&self) -> &K {
        &self.key
    }

    fn doc_id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

impl<K, V, D> DocumentRow for ViewRow<K, V, D> {
    type Doc = D;

    fn doc(&self) -> Option<&D> {
        self.doc.as_ref()
    }
}

// ── Reduced view rows ────────────────────────────────────────

/// One row of a reduced view query. Reduction collapses document identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedRow<K, V = serde_json::Value> {
    pub key: K,
    pub value: V,
}

impl<K: ViewKey + Clone, V> RowIdentity for ReducedRow<K, V> {
    type Key = K;

    fn key(&self) -> &K {
        &self.key
    }

    fn doc_id(&self) -> Option<&str> {
        None
    }
}

// ── _all_docs rows ───────────────────────────────────────────

/// A row of `_all_docs`. The wire `value` is `{"rev": "...", "deleted"?: true}`
/// and is unwrapped into plain fields.
#[derive(Debug, Clone, PartialEq)]
pub struct AllDocsRow<D = serde_json::Value> {
    pub id: String,
    pub key: String,
    pub rev: Option<String>,
    pub deleted: bool,
    pub doc: Option<D>,
}

#[derive(Deserialize)]
struct AllDocsWire<D> {
    id: String,
    key: String,
    #[serde(default)]
    value: Option<RevisionValue>,
    doc: Option<D>,
}

/// The `{"rev": ...}` object `_all_docs` smuggles into the value slot.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RevisionValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    deleted: bool,
}

impl<'de, D: Deserialize<'de>> Deserialize<'de> for AllDocsRow<D> {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        let wire = AllDocsWire::<D>::deserialize(deserializer)?;
        let value = wire.value.unwrap_or_default();
        Ok(AllDocsRow {
            id: wire.id,
            key: wire.key,
            rev: value.rev,
            deleted: value.deleted,
            doc: wire.doc,
        })
    }
}

impl<D: Serialize> Serialize for AllDocsRow<D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Out<'a, D> {
            id: &'a str,
            key: &'a str,
            value: RevisionValue,
            #[serde(skip_serializing_if = "Option::is_none")]
            doc: Option<&'a D>,
        }
        Out {
            id: &self.id,
            key: &self.key,
            value: RevisionValue {
                rev: self.rev.clone(),
                deleted: self.deleted,
            },
            doc: self.doc.as_ref(),
        }
        .serialize(serializer)
    }
}

impl<D> RowIdentity for AllDocsRow<D> {
    type Key = String;

    fn key(&self) -> &String {
        &self.key
    }

    fn doc_id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

impl<D> DocumentRow for AllDocsRow<D> {
    type Doc = D;

    fn doc(&self) -> Option<&D> {
        self.doc.as_ref()
    }
}

/// Serde helper for rows whose `value` is a nested `{"rev": "..."}` object
/// that should surface as a plain revision string.
///
/// ```ignore
/// #[serde(rename = "value", with = "couchview::row::nested_revision", default)]
/// rev: Option<String>,
/// ```
pub mod nested_revision {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::Object(map)) => match map.get("rev") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            },
            _ => None,
        })
    }

    pub fn serialize<S: Serializer>(rev: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        match rev {
            Some(rev) => serde_json::json!({ "rev": rev }).serialize(s),
            None => s.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn references_compare_structurally() {
        let a = RowReference::new(json!(["2024", 1]), Some("doc-1".into()));
        let b = RowReference::new(json!(["2024", 1.0]), Some("doc-1".into()));
        let c = RowReference::new(json!(["2024", 1]), Some("doc-2".into()));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);
    }

    #[test]
    fn reference_display_matches_log_format() {
        let r = RowReference::new("alice".to_string(), Some("u1".into()));
        assert_eq!(r.to_string(), "key=\"alice\", docId=u1");
        assert_eq!(describe::<String>(None), "null");
    }

    #[test]
    fn view_row_identity() {
        let row: ViewRow<Vec<String>> = serde_json::from_value(json!({
            "id": "book-1",
            "key": ["gesellix", "couchdb"],
            "value": null
        }))
        .unwrap();
        assert_eq!(row.doc_id(), Some("book-1"));
        assert!(row.doc().is_none());
        let r = row.row_reference();
        assert_eq!(r.key, vec!["gesellix".to_string(), "couchdb".to_string()]);
    }

    #[test]
    fn reduced_row_has_no_doc_id() {
        let row: ReducedRow<String, u64> =
            serde_json::from_value(json!({"key": "a", "value": 3})).unwrap();
        assert_eq!(row.doc_id(), None);
        assert_eq!(row.row_reference().doc_id, None);
    }

    #[test]
    fn all_docs_row_unwraps_revision() {
        let row: AllDocsRow = serde_json::from_value(json!({
            "id": "doc-a",
            "key": "doc-a",
            "value": {"rev": "1-967a00dff5e02add41819138abb3284d"},
            "doc": {"_id": "doc-a"}
        }))
        .unwrap();
        assert_eq!(row.rev.as_deref(), Some("1-967a00dff5e02add41819138abb3284d"));
        assert!(!row.deleted);
        assert_eq!(row.doc().unwrap()["_id"], "doc-a");

        let back = serde_json::to_value(&row).unwrap();
        assert_eq!(back["value"]["rev"], "1-967a00dff5e02add41819138abb3284d");
    }

    #[test]
    fn all_docs_row_deleted_marker() {
        let row: AllDocsRow = serde_json::from_value(json!({
            "id": "gone",
            "key": "gone",
            "value": {"rev": "2-abc", "deleted": true},
            "doc": null
        }))
        .unwrap();
        assert!(row.deleted);
        assert!(row.doc.is_none());
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Book {
        title: String,
    }

    #[test]
    fn rows_without_doc_for_non_default_doc_type() {
        let row: ViewRow<String, serde_json::Value, Book> =
            serde_json::from_value(json!({"id": "b1", "key": "k", "value": null})).unwrap();
        assert!(row.doc.is_none());

        let row: AllDocsRow<Book> = serde_json::from_value(json!({
            "id": "b1",
            "key": "b1",
            "value": {"rev": "1-a"},
            "doc": {"title": "Dune"}
        }))
        .unwrap();
        assert_eq!(row.doc().unwrap().title, "Dune");

        let row: AllDocsRow<Book> =
            serde_json::from_value(json!({"id": "b2", "key": "b2", "value": {"rev": "1-b"}}))
                .unwrap();
        assert!(row.doc.is_none());
    }

    #[derive(Deserialize)]
    struct RevOnly {
        id: String,
        #[serde(rename = "value", with = "nested_revision", default)]
        rev: Option<String>,
    }

    #[test]
    fn nested_revision_helper() {
        let row: RevOnly =
            serde_json::from_value(json!({"id": "x", "value": {"rev": "3-f00"}})).unwrap();
        assert_eq!(row.id, "x");
        assert_eq!(row.rev.as_deref(), Some("3-f00"));

        let row: RevOnly = serde_json::from_value(json!({"id": "y"})).unwrap();
        assert_eq!(row.rev, None);
    }
}
