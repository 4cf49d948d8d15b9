use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::error::CoreError;

/// What the backend is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Image,
    Story,
}

impl GenerationKind {
    /// Name for display in UI
    pub fn name(&self) -> &str {
        match self {
            Self::Image => "Picture",
            Self::Story => "Story",
        }
    }

    /// Kind ID for API communication
    pub fn id(&self) -> &str {
        match self {
            Self::Image => "image",
            Self::Story => "story",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        match self {
            Self::Image => "A colorful picture drawn from your idea",
            Self::Story => "A short illustrated story starring your idea",
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            Self::Image => "🎨",
            Self::Story => "📖",
        }
    }

    /// Estimated generation time in seconds
    pub fn estimated_time_secs(&self) -> u32 {
        match self {
            Self::Image => 30,
            Self::Story => 90,
        }
    }

    /// All available kinds
    pub fn all() -> [GenerationKind; 2] {
        [Self::Image, Self::Story]
    }
}

impl Default for GenerationKind {
    fn default() -> Self {
        Self::Image
    }
}

impl FromStr for GenerationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownKind(s.to_string()))
    }
}

/// Body of a `createGeneration` call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl GenerationRequest {
    pub fn new(kind: GenerationKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}
