//! Pure chain detection engine.
//!
//! No I/O happens here: every stage is a function of the order snapshot and the
//! evaluation date.

pub mod candidates;
pub mod detector;
pub mod merger;
pub mod normalizer;
pub mod status;
pub mod validator;

pub use candidates::{classify_roll, CandidateChain, GeneratorKind, RollSignal};
pub use detector::{ChainDetector, DetectError, DetectionReport, DetectionStats, RejectedCandidate};
pub use merger::merge_candidates;
pub use normalizer::{normalize_order, normalize_orders, DropReason, NormalizeIssue, Normalized};
pub use status::{build_chain, resolve_status};
pub use validator::{validate, FlowPattern, Rejection, ValidatedChain};
