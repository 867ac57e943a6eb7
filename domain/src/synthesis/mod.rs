//! Answer synthesis.
//!
//! Reduces a finished transcript to the single [`AnswerEnvelope`] returned
//! to the caller:
//!
//! - [`ResponseSynthesizer`]: locate, clean and parse the closing answer
//! - [`DataPointExtractor`]: citations from retrieval tool results
//! - [`MarkerFilter`]: hold back a termination marker split across deltas
//! - [`AnswerFieldFilter`]: stream only the `answer` of a JSON closing reply
//! - [`speech::sanitize_for_speech`]: strip markdown for text-to-speech

pub mod answer_field;
pub mod data_points;
pub mod envelope;
pub mod marker;
pub mod speech;
pub mod synthesizer;

pub use answer_field::AnswerFieldFilter;
pub use data_points::{DataPointExtractor, RETRIEVAL_TOOLS};
pub use envelope::{
    AnswerEnvelope, CONTENT_FILTERED_ANSWER, EMPTY_EXCHANGE_ANSWER, NO_ANSWER_PROVIDED,
    PROCESSING_ERROR_ANSWER,
};
pub use marker::MarkerFilter;
pub use synthesizer::{ParsedAnswer, ResponseSynthesizer};
