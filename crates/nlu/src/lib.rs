//! Argonaut Query Understanding
//!
//! Turns a free-text question about ocean sensor data into a structured
//! [`QueryAnalysis`]: typed entities, a classified intent, and
//! spatial/temporal/parameter scopes, with an advisory disambiguation check.
//!
//! The engine never fails hard: any internal error degrades to an
//! `UNKNOWN`-intent analysis with confidence 0 and an error note in the
//! result metadata.

pub mod engine;
pub mod entities;
pub mod intent;
pub mod scope;
pub mod translate;
pub mod types;
pub mod vocab;

pub use engine::QueryEngine;
pub use entities::EntityExtractor;
pub use intent::IntentClassifier;
pub use translate::{create_translator, NoopTranslator, Translator};
pub use types::{
    BoundingBox, DataMode, Entity, EntityLabel, EntitySource, Intent, ParameterScope,
    QueryAnalysis, SpatialScope, TemporalScope,
};
