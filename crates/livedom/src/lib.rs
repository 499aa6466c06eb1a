//! Incremental structural sync for HTML documents under live editing.
//!
//! A `Session` keeps an identified tree of the document, follows text edits,
//! and emits id-keyed edit scripts that let a remote renderer mirror the
//! source without re-rendering it wholesale.

pub mod builder;
pub mod classify;
pub mod config;
pub mod delta;
pub mod diff;
#[cfg(any(test, feature = "dom-snapshot"))]
pub mod dom_snapshot;
pub mod edit_script;
pub mod error;
pub mod ids;
pub mod instrument;
pub mod line_index;
pub mod reconcile;
pub mod scanner;
pub mod session;
#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;
pub mod tracker;
pub mod tree;

mod entities;
mod types;

pub use builder::{
    ElementRequest, FreshIds, IdentityPolicy, MarkLookup, PreserveIds, TreeBuilder,
    implied_closes,
};
pub use classify::{EditClass, classify, classify_text};
pub use config::{BuilderConfig, DEFAULT_ID_ATTRIBUTE, SyncConfig};
pub use core_types::{Position, TagId, TextRange};
pub use delta::{EditAction, EditDelta};
pub use diff::{RootAnchor, diff_from_empty, diff_subtrees};
pub use edit_script::{EditOp, EditScript, NodePayload};
pub use error::{
    DeltaProblem, DiffError, InstrumentError, ParseError, ParseErrorCode, ParseErrors, TreeError,
    UpdateError,
};
pub use ids::IdGenerator;
pub use instrument::instrument;
pub use line_index::LineIndex;
pub use reconcile::{ObservedNode, Reconciler, Reconciliation};
pub use scanner::{MarkupScanner, ScanError, ScanKind, ScanOutput, ScanToken, Span, TagScanner};
pub use session::{FullReason, MarkerUpdate, Session, UpdateOutcome, UpdatePath};
pub use tracker::shift_positions;
pub use tree::Tree;
pub use types::{Attributes, Descendants, Node, NodeKind, Signature};
