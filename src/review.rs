//! Review surface: project extraction results into editable rows and
//! finalize them.
//!
//! The surface is deliberately dumb about where values come from: it
//! receives the result set once, projects it into fixed rows, and from
//! then on owns only its own view/edit state. Persisting the finalized
//! rows is delegated to a [`CommitSink`] and treated as fire-and-forget;
//! closing the surface without committing never touches the sink.

use crate::model::ExtractionResult;
use crate::queries::REVIEW_ROWS;
use serde::Serialize;
use tracing::info;

/// One display row: the matched value and a formatted confidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRow {
    /// Matched text, or empty when the query resolved nothing.
    pub value: String,
    /// Confidence rendered as `"98.2%"`; `"0.0%"` for a missing row.
    pub confidence: String,
}

impl ReviewRow {
    fn from_result(result: Option<&ExtractionResult>) -> Self {
        let value = result
            .and_then(|r| r.text.clone())
            .unwrap_or_default();
        let confidence = result.map(|r| r.confidence).unwrap_or(0.0);
        Self {
            value,
            confidence: format!("{confidence:.1}%"),
        }
    }
}

/// Per-attempt review state: the projected rows, an edit-mode flag, and a
/// working copy of edited values.
///
/// Created when results arrive, mutated only through the explicit edit
/// actions, and destroyed when the surface closes (commit or discard).
#[derive(Debug, Clone)]
pub struct ReviewSheet {
    projected: Vec<ReviewRow>,
    draft: Vec<ReviewRow>,
    editing: bool,
}

impl ReviewSheet {
    /// Project a result set into exactly [`REVIEW_ROWS`] rows, taken
    /// positionally from the front of `results`.
    ///
    /// Missing positions default to an empty value and `0.0%` confidence
    /// rather than failing; extra entries are ignored.
    pub fn from_results(results: &[ExtractionResult]) -> Self {
        let projected: Vec<ReviewRow> = (0..REVIEW_ROWS)
            .map(|i| ReviewRow::from_result(results.get(i)))
            .collect();
        Self {
            draft: projected.clone(),
            projected,
            editing: false,
        }
    }

    /// The rows currently presented: the working copy in edit mode, the
    /// projection otherwise.
    pub fn rows(&self) -> &[ReviewRow] {
        if self.editing {
            &self.draft
        } else {
            &self.projected
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Enter edit mode, seeding the working copy from the projection.
    pub fn begin_edit(&mut self) {
        self.draft = self.projected.clone();
        self.editing = true;
    }

    /// Replace one row's working value. Only valid in edit mode and only
    /// for an existing row; confidence is never editable.
    pub fn set_value(&mut self, index: usize, value: impl Into<String>) -> bool {
        if !self.editing || index >= self.draft.len() {
            return false;
        }
        self.draft[index].value = value.into();
        true
    }

    /// Leave edit mode, restoring the pre-edit projected values.
    pub fn cancel_edit(&mut self) {
        self.editing = false;
    }

    /// Finalize the row set and close the surface.
    ///
    /// Edited values take precedence when the surface is in edit mode;
    /// otherwise the untouched projection is committed. The sink call is
    /// fire-and-forget.
    pub fn commit(self, sink: &dyn CommitSink) -> Vec<ReviewRow> {
        let rows = if self.editing {
            self.draft
        } else {
            self.projected
        };
        sink.commit(&rows);
        rows
    }

    /// Close the surface without finalizing; all review state is dropped.
    pub fn discard(self) {}
}

/// Receives the finalized row set on commit.
///
/// The act of persisting is an external collaborator's concern; the
/// review surface fires the call and moves on.
pub trait CommitSink: Send + Sync {
    fn commit(&self, rows: &[ReviewRow]);
}

/// Default sink: logs the finalized rows.
pub struct LogSink;

impl CommitSink for LogSink {
    fn commit(&self, rows: &[ReviewRow]) {
        for (i, row) in rows.iter().enumerate() {
            info!(
                "Committed row {}: value='{}' confidence={}",
                i, row.value, row.confidence
            );
        }
    }
}
