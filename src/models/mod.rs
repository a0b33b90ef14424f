pub mod document;
pub mod line_item;
pub mod result;
pub mod summary;

pub use document::{CurrencyValue, DocumentSummary, ExtractedDocument, ExtractedField, ExtractedItem};
pub use line_item::{LineItem, SourceKind};
pub use result::{MatchResult, MatchStatus, MatchStrategy};
pub use summary::{CheckKind, DocumentCheck, ReconciliationSummary};
