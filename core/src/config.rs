use serde::{Deserialize, Serialize};

/// Which inverse-document-frequency formula the vector calculator applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfMode {
    /// `ln(N / df)`
    #[default]
    Standard,
    /// `ln(1 + N / df)`; keeps weights non-zero in a single-document corpus.
    Smoothed,
}

impl IdfMode {
    pub fn idf(self, corpus_size: usize, document_frequency: usize) -> f64 {
        let ratio = corpus_size as f64 / document_frequency.max(1) as f64;
        match self {
            IdfMode::Standard => ratio.ln(),
            IdfMode::Smoothed => (1.0 + ratio).ln(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Minimum cosine score for two documents to count as duplicates.
    #[serde(default = "default_threshold")]
    pub matching_threshold: f64,
    #[serde(default)]
    pub idf: IdfMode,
}

fn default_threshold() -> f64 { 0.5 }

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self { matching_threshold: default_threshold(), idf: IdfMode::default() }
    }
}

impl SimilarityConfig {
    /// Read `MATCHING_THRESHOLD` and `SMOOTHED_IDF`, falling back to defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("MATCHING_THRESHOLD") {
            match raw.trim().parse::<f64>() {
                Ok(t) => config.matching_threshold = t,
                Err(_) => tracing::warn!(value = %raw, "ignoring unparsable MATCHING_THRESHOLD"),
            }
        }
        if let Ok(raw) = std::env::var("SMOOTHED_IDF") {
            if matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                config.idf = IdfMode::Smoothed;
            }
        }
        config
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.matching_threshold = threshold;
        self
    }

    pub fn with_idf(mut self, idf: IdfMode) -> Self {
        self.idf = idf;
        self
    }
}
