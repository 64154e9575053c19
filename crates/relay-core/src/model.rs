use crate::error::RelayError;
use std::fmt;
use std::str::FromStr;

/// The model a caller asks for, by its public name.
///
/// Each selector resolves to the processing mode understood by the upstream
/// service. Unknown names never get past [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelSelector {
    /// `default`: the standard chat mode.
    #[default]
    Default,
    /// `think-deeper`: slower reasoning mode.
    ThinkDeeper,
    /// `gpt-5`: the "smart" mode.
    Gpt5,
}

impl ModelSelector {
    /// All selectors, in the order they are advertised to callers.
    pub const ALL: [ModelSelector; 3] = [
        ModelSelector::Default,
        ModelSelector::ThinkDeeper,
        ModelSelector::Gpt5,
    ];

    /// The public name accepted in requests.
    pub fn name(self) -> &'static str {
        match self {
            ModelSelector::Default => "default",
            ModelSelector::ThinkDeeper => "think-deeper",
            ModelSelector::Gpt5 => "gpt-5",
        }
    }

    /// The upstream mode identifier sent on the wire.
    pub fn upstream_mode(self) -> &'static str {
        match self {
            ModelSelector::Default => "chat",
            ModelSelector::ThinkDeeper => "reasoning",
            ModelSelector::Gpt5 => "smart",
        }
    }

    /// Human-readable list of valid names, e.g. for error messages.
    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Resolves an optional name, falling back to [`ModelSelector::Default`].
    pub fn resolve(name: Option<&str>) -> Result<Self, RelayError> {
        name.map_or(Ok(Self::default()), str::parse)
    }
}

impl FromStr for ModelSelector {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| {
                RelayError::InvalidInput(format!("Available models: {}", Self::available()))
            })
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
