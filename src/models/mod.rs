pub mod document;
pub mod group;
pub mod signals;

pub use document::{
    ClassifiedDocument, DocumentRole, ExtractedText, ExtractionFailure, InputDocument,
};
pub use group::{
    BatchReport, GroupStatus, GroupSummary, MatchGroup, MatchSignal, OutputArtifact,
    UNMATCHED_PREFIX,
};
pub use signals::SignalSet;
