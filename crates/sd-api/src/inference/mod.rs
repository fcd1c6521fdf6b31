//! Natural-language understanding for the dispatcher.
//!
//! - **Rules** (`rules`): deterministic keyword classifier, no external calls.
//! - **Extraction** (`extract`): regex and catalog matching first, then one
//!   constrained chat call for whatever is still unknown.

pub mod extract;
pub mod rules;

pub use extract::{FieldExtractor, UpdateRequest};
pub use rules::classify;
