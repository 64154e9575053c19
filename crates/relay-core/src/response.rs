use serde::{Deserialize, Serialize};

/// A reference the upstream attached to its answer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Citation {
    /// Title of the cited page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Icon (favicon) URL of the cited page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// URL of the cited page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The aggregated result of one chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Concatenation of every text fragment, in arrival order.
    pub text: String,
    /// Every citation, in arrival order.
    pub citations: Vec<Citation>,
}

impl ChatResponse {
    /// Appends a streamed text fragment.
    pub fn push_text(&mut self, fragment: &str) {
        self.text.push_str(fragment);
    }

    /// Appends a citation.
    pub fn push_citation(&mut self, citation: Citation) {
        self.citations.push(citation);
    }
}
