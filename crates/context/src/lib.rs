//! Argonaut Context Engine
//!
//! The last stage of the pipeline: merges structured rows and ranked
//! passages into a bounded evidence context, calls the external generation
//! service, fact-checks the prose, scores answer quality, and wraps
//! everything in one exhaustively-matched answer type.

pub mod answer;
pub mod assembler;
pub mod factcheck;
pub mod generation;
pub mod pipeline;
pub mod quality;

pub use answer::{Answer, ErrorAnswer, NoDataAnswer, StandardAnswer, TemporalAnswer};
pub use assembler::{EvidenceAssembler, EvidenceBundle};
pub use factcheck::{FactCheckReport, FactChecker};
pub use generation::{GenerationService, HttpGenerator, MockGenerator};
pub use pipeline::Pipeline;
pub use quality::{QualityReport, QualityScorer};
