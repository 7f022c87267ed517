//! rag-context - context combination and prompt assembly
//!
//! Turns the ranked candidates of a request into a deduplicated,
//! categorized context block and wraps it in a style-specific prompt,
//! optionally written in another output language.

mod combiner;
mod prompt;

pub use combiner::{
    classify, sentences, step_marker_count, CombinedContext, ContextCombiner, NO_CONTEXT,
};
pub use prompt::{not_found_notice, FewShotExample, PromptAssembler, StyleComparison};
