use serde::{Deserialize, Serialize};

// ── Response variants ────────────────────────────────────────

/// A page of a map-only view. `offset` and `total_rows` describe where the
/// page sits in the whole index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonReducedViewQueryResponse<R> {
    pub rows: Option<Vec<R>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_seq: Option<serde_json::Value>,
}

/// A page of a reduced view. Reduction collapses row identity, so there is
/// no count metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedViewQueryResponse<R> {
    pub rows: Option<Vec<R>>,
}

/// One page of view results, in the order the database returned them.
///
/// `rows` is optional at this level so a payload with a missing or `null`
/// row list can still be decoded and then rejected by the pager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireResponse<R>", into = "WireResponse<R>")]
#[serde(bound(
    deserialize = "R: Deserialize<'de>",
    serialize = "R: Serialize + Clone"
))]
pub enum ViewQueryResponse<R> {
    NonReduced(NonReducedViewQueryResponse<R>),
    Reduced(ReducedViewQueryResponse<R>),
}

impl<R> ViewQueryResponse<R> {
    pub fn non_reduced(rows: Vec<R>, offset: u64, total_rows: u64) -> Self {
        ViewQueryResponse::NonReduced(NonReducedViewQueryResponse {
            rows: Some(rows),
            offset: Some(offset),
            total_rows: Some(total_rows),
            update_seq: None,
        })
    }

    pub fn reduced(rows: Vec<R>) -> Self {
        ViewQueryResponse::Reduced(ReducedViewQueryResponse { rows: Some(rows) })
    }

    pub fn is_reduced(&self) -> bool {
        matches!(self, ViewQueryResponse::Reduced(_))
    }

    /// False when the payload had no row list at all.
    pub fn has_rows(&self) -> bool {
        self.rows_opt().is_some()
    }

    fn rows_opt(&self) -> Option<&Vec<R>> {
        match self {
            ViewQueryResponse::NonReduced(r) => r.rows.as_ref(),
            ViewQueryResponse::Reduced(r) => r.rows.as_ref(),
        }
    }

    /// The rows of this page. Empty if the payload carried none.
    pub fn rows(&self) -> &[R] {
        self.rows_opt().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rows_mut(&mut self) -> Option<&mut Vec<R>> {
        match self {
            ViewQueryResponse::NonReduced(r) => r.rows.as_mut(),
            ViewQueryResponse::Reduced(r) => r.rows.as_mut(),
        }
    }

    pub fn into_rows(self) -> Vec<R> {
        match self {
            ViewQueryResponse::NonReduced(r) => r.rows,
            ViewQueryResponse::Reduced(r) => r.rows,
        }
        .unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.rows().len()
    }

    /// Index offset of the first row. Only map-only views report it.
    pub fn offset(&self) -> Option<u64> {
        match self {
            ViewQueryResponse::NonReduced(r) => r.offset,
            ViewQueryResponse::Reduced(_) => None,
        }
    }

    pub fn total_rows(&self) -> Option<u64> {
        match self {
            ViewQueryResponse::NonReduced(r) => r.total_rows,
            ViewQueryResponse::Reduced(_) => None,
        }
    }

    pub fn update_seq(&self) -> Option<&serde_json::Value> {
        match self {
            ViewQueryResponse::NonReduced(r) => r.update_seq.as_ref(),
            ViewQueryResponse::Reduced(_) => None,
        }
    }

    /// Rows of the index that follow this page, if the counts are known.
    pub fn remaining_rows(&self) -> Option<u64> {
        let offset = self.offset()?;
        let total = self.total_rows()?;
        Some(total.saturating_sub(offset.saturating_add(self.row_count() as u64)))
    }
}

// ── Wire shape ───────────────────────────────────────────────

/// Both variants share one JSON object; a page is map-only when it carries
/// either count field.
#[derive(Serialize, Deserialize)]
struct WireResponse<R> {
    rows: Option<Vec<R>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    update_seq: Option<serde_json::Value>,
}

impl<R> From<WireResponse<R>> for ViewQueryResponse<R> {
    fn from(wire: WireResponse<R>) -> Self {
        if wire.offset.is_some() || wire.total_rows.is_some() {
            ViewQueryResponse::NonReduced(NonReducedViewQueryResponse {
                rows: wire.rows,
                offset: wire.offset,
                total_rows: wire.total_rows,
                update_seq: wire.update_seq,
            })
        } else {
            ViewQueryResponse::Reduced(ReducedViewQueryResponse { rows: wire.rows })
        }
    }
}

impl<R> From<ViewQueryResponse<R>> for WireResponse<R> {
    fn from(resp: ViewQueryResponse<R>) -> Self {
        match resp {
            ViewQueryResponse::NonReduced(r) => WireResponse {
                rows: r.rows,
                offset: r.offset,
                total_rows: r.total_rows,
                update_seq: r.update_seq,
            },
            ViewQueryResponse::Reduced(r) => WireResponse {
                rows: r.rows,
                offset: None,
                total_rows: None,
                update_seq: None,
            },
        }
    }
}
