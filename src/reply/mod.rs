//! The persona-driven reply pipeline: classify the inbound message, build
//! predicate-gated candidate pools, select one reply.
//!
//! Every stage is a pure function of its inputs (plus an injected RNG for
//! selection), so the pipeline is fully reproducible under test.

pub mod candidates;
pub mod classifier;
pub mod locale;
pub mod selector;

pub use candidates::{generate, Candidate, PoolKind};
pub use classifier::{Classification, DirectQuestionKind, LengthBucket, MessageClassifier, SemanticTag};
pub use locale::{Locale, LocaleLexicon, LocaleSignalDetector, LOCALE_LOOKBACK_MESSAGES};
pub use selector::select;
