//! Page perception port
//!
//! Defines the interface for reading the page as structured data: which
//! elements are interactive, what the page offers, plus screenshots for
//! vision-capable executors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use webpilot_domain::{ElementSelector, PageState};

/// Errors that can occur during perception
#[derive(Error, Debug)]
pub enum PerceptionError {
    #[error("Page capture failed: {0}")]
    CaptureFailed(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// One interactive element as perception sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveElement {
    /// Stable index within this snapshot, matches the highlighted screenshot
    pub index: u32,
    pub selector: ElementSelector,
    pub tag: String,
    /// Visible text or accessible label
    pub label: String,
}

/// Full perception output for the current page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub elements: Vec<InteractiveElement>,
    pub visible_sections: Vec<String>,
    pub available_actions: Vec<String>,
    /// Screenshot without overlays
    pub pristine_screenshot: Option<String>,
    /// Screenshot with element indices drawn in
    pub highlighted_screenshot: Option<String>,
}

impl PageSnapshot {
    /// Collapses the snapshot into the domain's page-state representation.
    pub fn to_page_state(&self) -> PageState {
        let mut state = PageState::new(&self.url, &self.title)
            .with_sections(self.visible_sections.clone())
            .with_actions(self.available_actions.clone());
        if let Some(screenshot) = &self.pristine_screenshot {
            state = state.with_screenshot(screenshot.clone());
        }
        state
    }

    /// Text rendering of the interactive elements for executor prompts.
    pub fn dom_summary(&self) -> String {
        if self.elements.is_empty() {
            return "No interactive elements detected.".to_string();
        }
        self.elements
            .iter()
            .map(|e| format!("[{}] <{}> {} ({})", e.index, e.tag, e.label, e.selector))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Perception of the active page
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait DomService: Send + Sync {
    /// Capture a structured snapshot of the current page
    async fn perceive(&self) -> Result<PageSnapshot, PerceptionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dom_summary_lists_elements() {
        let snapshot = PageSnapshot {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            elements: vec![InteractiveElement {
                index: 1,
                selector: ElementSelector::Css("#search".to_string()),
                tag: "input".to_string(),
                label: "Search".to_string(),
            }],
            ..Default::default()
        };

        let summary = snapshot.dom_summary();
        assert!(summary.contains("[1] <input> Search"));
    }

    #[test]
    fn test_to_page_state_carries_sections_and_screenshot() {
        let snapshot = PageSnapshot {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            visible_sections: vec!["nav".to_string()],
            available_actions: vec!["search".to_string()],
            pristine_screenshot: Some("img-ref".to_string()),
            ..Default::default()
        };

        let state = snapshot.to_page_state();
        assert_eq!(state.url, "https://example.com");
        assert_eq!(state.visible_sections, vec!["nav"]);
        assert_eq!(state.screenshot.as_deref(), Some("img-ref"));
    }
}
