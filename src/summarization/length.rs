//! Fixed mapping from summary length tiers to generation targets.

/// Requested summary length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthTier {
    /// Two sentences, roughly 75 tokens.
    Short,
    /// Three sentences, roughly 150 tokens.
    #[default]
    Medium,
    /// Five sentences, roughly 300 tokens.
    Long,
}

/// Generation targets for one length tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthConfig {
    /// Token budget handed to abstractive providers.
    pub target_tokens: u32,
    /// Number of sentences kept by the extractive summarizer.
    pub target_sentences: usize,
    /// Length label understood by providers that take one.
    pub provider_length_hint: &'static str,
}

const SHORT: LengthConfig = LengthConfig {
    target_tokens: 75,
    target_sentences: 2,
    provider_length_hint: "short",
};

const MEDIUM: LengthConfig = LengthConfig {
    target_tokens: 150,
    target_sentences: 3,
    provider_length_hint: "medium",
};

const LONG: LengthConfig = LengthConfig {
    target_tokens: 300,
    target_sentences: 5,
    provider_length_hint: "long",
};

impl LengthTier {
    /// Resolve a caller-supplied label; unknown labels fall back to [`LengthTier::Medium`].
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "short" => Self::Short,
            "long" => Self::Long,
            _ => Self::Medium,
        }
    }

    /// Targets associated with this tier.
    pub const fn config(self) -> &'static LengthConfig {
        match self {
            Self::Short => &SHORT,
            Self::Medium => &MEDIUM,
            Self::Long => &LONG,
        }
    }

    /// Canonical label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}
