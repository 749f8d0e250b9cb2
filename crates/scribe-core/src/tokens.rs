/// Counts tokens for a given model's tokenizer. Used only to annotate
/// the persisted message; nothing downstream depends on exactness.
pub trait TokenCounter: Send + Sync {
    fn count(&self, model: &str, text: &str) -> u32;
}

/// Rough estimator: roughly 4 characters per token for English prose.
pub struct HeuristicCounter;

impl TokenCounter for HeuristicCounter {
    fn count(&self, _model: &str, text: &str) -> u32 {
        (text.chars().count() as u32).div_ceil(4)
    }
}
