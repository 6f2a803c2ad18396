//! Lifter Age Interpolation Engine
//!
//! Fills in missing ages in competition results from the ages, birth years
//! and division bounds recorded at a lifter's other meets. Lifters are
//! processed independently, in parallel on the rayon pool.

pub mod age_class;
pub mod config;
pub mod date_index;
pub mod error;
pub mod inference;
pub mod model;
pub mod pass;
pub mod persistence;
pub mod store;
pub mod synthetic;

pub use age_class::AgeClass;
pub use config::InterpolationConfig;
pub use date_index::DateIndex;
pub use error::{Error, Inconsistency, Result};
pub use model::{Age, AgeBounds, AgeObservation, EventId, LifterId};
pub use pass::{interpolate_dataset, InterpolationPass, PassOutput, PassStats};
pub use persistence::{Dataset, OutputDataset, SaveStats};
pub use store::{LifterRecord, ObservationStore};
