use std::collections::BTreeMap;

use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A stored document: CouchDB's underscore metadata around a user body.
///
/// This is the usual `D` for rows fetched with `include_docs=true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(rename = "_deleted", default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    /// Calendar dates as `YYYY-MM-DD`.
    #[serde(rename = "dateCreated", default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<NaiveDate>,
    #[serde(rename = "dateUpdated", default, skip_serializing_if = "Option::is_none")]
    pub date_updated: Option<NaiveDate>,
    #[serde(rename = "_attachments", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attachments: BTreeMap<String, Attachment>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Document<T> {
    pub fn new(id: impl Into<String>, body: T) -> Self {
        Self {
            id: id.into(),
            rev: None,
            deleted: false,
            date_created: None,
            date_updated: None,
            attachments: BTreeMap::new(),
            body,
        }
    }

    pub fn is_design_document(&self) -> bool {
        self.id.starts_with("_design/")
    }
}

/// Inline or stub attachment metadata. `data` is present only when the
/// document was fetched with `attachments=true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stub: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revpos: Option<u64>,
}

impl Attachment {
    /// Inline attachment from raw bytes.
    pub fn inline(content_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            content_type: content_type.into(),
            data: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            stub: false,
            length: Some(bytes.len() as u64),
            digest: None,
            revpos: None,
        }
    }

    /// Decoded attachment body, or `None` for stubs.
    pub fn decoded(&self) -> Result<Option<Vec<u8>>> {
        match &self.data {
            Some(b64) => Ok(Some(base64::engine::general_purpose::STANDARD.decode(b64)?)),
            None => Ok(None),
        }
    }
}
