//! Page state and change detection.
//!
//! A [`PageState`] is a cheap structural snapshot of the page: what sections
//! are visible and what the user could do next. Change detection compares
//! snapshots by Jaccard distance over those sets, so cosmetic churn stays
//! below the threshold while navigations and layout shifts cross it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Structural snapshot of the current page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageState {
    pub url: String,
    pub title: String,
    /// Section headings / landmarks visible on the page
    pub visible_sections: Vec<String>,
    /// Affordances the page currently offers ("search", "add to cart", ...)
    pub available_actions: Vec<String>,
    /// Screenshot reference or base64, when captured
    pub screenshot: Option<String>,
    /// Data extracted from this page so far
    pub extracted: serde_json::Value,
    pub captured_at: DateTime<Utc>,
}

impl PageState {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            visible_sections: Vec::new(),
            available_actions: Vec::new(),
            screenshot: None,
            extracted: serde_json::Value::Object(serde_json::Map::new()),
            captured_at: Utc::now(),
        }
    }

    pub fn with_sections(mut self, sections: Vec<String>) -> Self {
        self.visible_sections = sections;
        self
    }

    pub fn with_actions(mut self, actions: Vec<String>) -> Self {
        self.available_actions = actions;
        self
    }

    pub fn with_screenshot(mut self, screenshot: impl Into<String>) -> Self {
        self.screenshot = Some(screenshot.into());
        self
    }

    /// One-line description for prompts and logs.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}) - {} sections, {} actions",
            self.title,
            self.url,
            self.visible_sections.len(),
            self.available_actions.len()
        )
    }
}

/// Thresholds for deciding whether two snapshots differ meaningfully.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateDiffPolicy {
    /// Change is significant when section distance exceeds this
    pub section_threshold: f64,
    /// Change is significant when action distance exceeds this
    pub action_threshold: f64,
}

impl Default for StateDiffPolicy {
    fn default() -> Self {
        Self {
            section_threshold: 0.5,
            action_threshold: 0.5,
        }
    }
}

impl StateDiffPolicy {
    /// `true` when the page changed enough to warrant reassessment.
    ///
    /// A URL change is always significant; otherwise either the section set
    /// or the action set must move past its threshold.
    pub fn has_significant_change(&self, previous: &PageState, current: &PageState) -> bool {
        if previous.url != current.url {
            return true;
        }
        jaccard_distance(&previous.visible_sections, &current.visible_sections)
            > self.section_threshold
            || jaccard_distance(&previous.available_actions, &current.available_actions)
                > self.action_threshold
    }
}

/// Jaccard distance between two string sets: `1 - |a ∩ b| / |a ∪ b|`.
///
/// Two empty sets are identical (distance 0).
pub fn jaccard_distance(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<&String> = a.iter().collect();
    let set_b: HashSet<&String> = b.iter().collect();
    if set_a.is_empty() && set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    1.0 - intersection / union
}

/// Deep-merges `from` into `into`.
///
/// Objects merge recursively; everything else is overwritten by the later
/// value. Extraction runs accumulate across pages this way.
pub fn merge_extracted(into: &mut serde_json::Value, from: &serde_json::Value) {
    match (into, from) {
        (serde_json::Value::Object(into_map), serde_json::Value::Object(from_map)) => {
            for (key, value) in from_map {
                match into_map.get_mut(key) {
                    Some(existing) => merge_extracted(existing, value),
                    None => {
                        into_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (into_slot, from_value) => {
            *into_slot = from_value.clone();
        }
    }
}
