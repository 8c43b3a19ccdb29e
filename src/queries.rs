//! The fixed, ordered extraction query list.
//!
//! The same ordered list is sent with every analysis request, so the
//! review surface can interpret the response positionally: row 0 is the
//! gross-pay answer, row 1 the net-pay answer. The engine does not
//! guarantee that it emits answers in submission order, which makes the
//! positional interpretation a known fragility of the deployed wire
//! contract (the response carries no query alias to correlate by). We
//! reproduce the positional behaviour for compatibility; see DESIGN.md.

/// Query answered by review row 0.
pub const GROSS_PAY_QUERY: &str = "What is the Gross Pay for this period?";

/// Query answered by review row 1.
pub const NET_PAY_QUERY: &str = "What is the Net Pay?";

/// The queries posed to the analysis engine, in submission order.
///
/// Not user-editable; configured once here so client and server agree on
/// the row count and ordering.
pub const EXTRACTION_QUERIES: &[&str] = &[GROSS_PAY_QUERY, NET_PAY_QUERY];

/// Number of rows the review surface presents.
pub const REVIEW_ROWS: usize = EXTRACTION_QUERIES.len();
