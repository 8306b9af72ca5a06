//! Site-scoped memory: what worked and what failed on previous runs.
//!
//! Learnings are keyed by a [`MemoryContext`] so that advice from one site
//! and goal never leaks into an unrelated run. Ranking strongly prefers an
//! exact context match and only then weighs confidence and freshness.

use crate::core::string::slugify;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum slug length for the goal component of a memory key.
pub const GOAL_SLUG_LEN: usize = 50;

/// Where a learning applies: one site, one goal, optionally one page section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryContext {
    pub hostname: String,
    pub goal: String,
    pub section: Option<String>,
}

impl MemoryContext {
    pub fn new(hostname: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            goal: goal.into(),
            section: None,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn goal_slug(&self) -> String {
        slugify(&self.goal, GOAL_SLUG_LEN)
    }

    /// Storage key: `hostname:goal-slug:section` with `general` as the
    /// default section.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.hostname,
            self.goal_slug(),
            self.section.as_deref().unwrap_or("general")
        )
    }

    /// Token-level Jaccard similarity between the two goals' slugs.
    pub fn goal_similarity(&self, other: &MemoryContext) -> f64 {
        goal_similarity(&self.goal, &other.goal)
    }
}

/// Jaccard similarity over slug tokens of two goals.
pub fn goal_similarity(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<String> = slug_tokens(a);
    let tokens_b: HashSet<String> = slug_tokens(b);
    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count() as f64;
    let union = tokens_a.union(&tokens_b).count() as f64;
    if union == 0.0 { 0.0 } else { intersection / union }
}

fn slug_tokens(goal: &str) -> HashSet<String> {
    slugify(goal, GOAL_SLUG_LEN)
        .split('-')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// One remembered lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// The lesson in plain language
    pub learning: String,
    /// Action that should not be repeated
    pub action_to_avoid: Option<String>,
    /// What to try instead
    pub alternative_action: Option<String>,
    /// 0.0..=1.0, how sure we are the lesson holds
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(learning: impl Into<String>, confidence: f64) -> Self {
        Self {
            learning: learning.into(),
            action_to_avoid: None,
            alternative_action: None,
            confidence: confidence.clamp(0.0, 1.0),
            created_at: Utc::now(),
        }
    }

    pub fn with_avoidance(
        mut self,
        avoid: impl Into<String>,
        alternative: impl Into<String>,
    ) -> Self {
        self.action_to_avoid = Some(avoid.into());
        self.alternative_action = Some(alternative.into());
        self
    }

    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        let seconds = (now - self.created_at).num_seconds().max(0) as f64;
        seconds / 3600.0
    }

    /// Ranking score for retrieval.
    ///
    /// Exact context matches dominate (1000 points), then confidence
    /// (up to 100), minus a freshness penalty of one point per day,
    /// capped at 10.
    pub fn relevance_score(&self, exact_match: bool, now: DateTime<Utc>) -> f64 {
        let exact = if exact_match { 1000.0 } else { 0.0 };
        let recency_penalty = (self.age_hours(now) / 24.0).min(10.0);
        exact + 100.0 * self.confidence - recency_penalty
    }
}
