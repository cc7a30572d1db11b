use async_trait::async_trait;

/// Auxiliary text injected into the decision prompt (strategy notes, market
/// sentiment, headlines). Sources are best-effort: `None` means nothing to
/// add this cycle.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Section heading used in the prompt
    fn name(&self) -> &str;

    async fn fetch(&self) -> Option<String>;
}
