/// Reserved attribute carrying engine ids in instrumented output.
pub const DEFAULT_ID_ATTRIBUTE: &str = "data-livedom-id";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// When false every update takes the full (identity-preserving) path.
    pub incremental: bool,
    /// Attribute injected by `instrument` and stripped by the reconciler.
    pub id_attribute: String,
    pub builder: BuilderConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            incremental: true,
            id_attribute: DEFAULT_ID_ATTRIBUTE.to_string(),
            builder: BuilderConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Close HTML elements with optional end tags (`p`, `li`, `td`, ...)
    /// implicitly instead of reporting them as unclosed.
    pub implied_end_tags: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            implied_end_tags: true,
        }
    }
}
