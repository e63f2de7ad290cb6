//! Invoice field extraction, validation and duplicate detection.

mod duplicates;
mod extractor;
pub mod normalize;
mod report;
mod validator;

pub use duplicates::{DuplicateDetector, DuplicateKeys, DuplicateVerdict, VerdictKind};
pub use extractor::{CompiledRule, FieldExtractor, FieldMatch, MatchPass};
pub use report::{
    DuplicateReport, EXACT_REASON, Evidence, EvidenceEntry, ReportEntry, SIMILAR_REASON, UNKNOWN,
};
pub use validator::{RecordValidator, ValidationOutcome, check_type, is_date_like, is_email, is_number};
