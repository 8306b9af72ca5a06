//! Site-scoped learning service.
//!
//! Keeps what worked and what failed per `hostname:goal:section` context,
//! feeds it back into prompts, and optionally mirrors everything to a
//! repository. Repository failures are logged and swallowed: losing a
//! lesson must never fail a run.

use crate::ports::repositories::MemoryRepository;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use webpilot_domain::memory::goal_similarity;
use webpilot_domain::{MemoryContext, MemoryEntry};

/// Memories returned per query, after ranking.
const RELEVANT_LIMIT: usize = 10;
/// Similar-context matches must clear this goal similarity.
const SIMILARITY_FLOOR: f64 = 0.7;

/// Confidence assigned to lessons learned from failures.
const FAILURE_CONFIDENCE: f64 = 0.9;
/// Confidence assigned to lessons learned from successes.
const SUCCESS_CONFIDENCE: f64 = 0.8;

/// Stores and retrieves learnings across runs.
pub struct MemoryService {
    /// context key -> entries, newest last
    store: HashMap<String, Vec<MemoryEntry>>,
    repository: Option<Arc<dyn MemoryRepository>>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self {
            store: HashMap::new(),
            repository: None,
        }
    }

    pub fn with_repository(mut self, repository: Arc<dyn MemoryRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Loads previously persisted memories into the in-memory store.
    pub async fn warm_up(&mut self) {
        let Some(repository) = &self.repository else {
            return;
        };
        match repository.load_all().await {
            Ok(entries) => {
                for (key, memories) in entries {
                    self.store.entry(key).or_default().extend(memories);
                }
                debug!(contexts = self.store.len(), "memory warm-up complete");
            }
            Err(e) => warn!("memory warm-up failed: {e}"),
        }
    }

    /// Records a lesson under the context's key, mirroring to the
    /// repository best-effort.
    pub async fn add_learning(&mut self, context: &MemoryContext, entry: MemoryEntry) {
        let key = context.key();
        if let Some(repository) = &self.repository
            && let Err(e) = repository.save(&key, &entry).await
        {
            warn!(key = %key, "failed to persist learning: {e}");
        }
        self.store.entry(key).or_default().push(entry);
    }

    /// Records that an action failed and, optionally, what to try instead.
    pub async fn learn_from_failure(
        &mut self,
        context: &MemoryContext,
        failed_action: &str,
        error: &str,
        alternative: Option<&str>,
    ) {
        let entry = MemoryEntry::new(
            format!("Action '{failed_action}' failed: {error}"),
            FAILURE_CONFIDENCE,
        )
        .with_avoidance(
            failed_action,
            alternative.unwrap_or("try a different approach"),
        );
        self.add_learning(context, entry).await;
    }

    /// Records that an action worked here.
    pub async fn learn_from_success(&mut self, context: &MemoryContext, action: &str) {
        let entry = MemoryEntry::new(
            format!("Action '{action}' worked for this goal"),
            SUCCESS_CONFIDENCE,
        );
        self.add_learning(context, entry).await;
    }

    /// Memories worth showing for this context: exact key matches plus
    /// same-hostname contexts whose goals are similar enough, ranked by
    /// relevance, capped at [`RELEVANT_LIMIT`].
    pub fn relevant_memories(&self, context: &MemoryContext) -> Vec<MemoryEntry> {
        let now = Utc::now();
        let exact_key = context.key();
        let hostname_prefix = format!("{}:", context.hostname);

        let mut scored: Vec<(f64, &MemoryEntry)> = Vec::new();
        for (key, entries) in &self.store {
            let exact = *key == exact_key;
            if !exact {
                if !key.starts_with(&hostname_prefix) {
                    continue;
                }
                // key shape is hostname:goal-slug:section
                let goal_slug = key.split(':').nth(1).unwrap_or_default();
                if goal_similarity(goal_slug, &context.goal) <= SIMILARITY_FLOOR {
                    continue;
                }
            }
            for entry in entries {
                scored.push((entry.relevance_score(exact, now), entry));
            }
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(RELEVANT_LIMIT)
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Renders relevant memories as prompt text.
    pub fn memory_prompt(&self, context: &MemoryContext) -> String {
        let memories = self.relevant_memories(context);
        if memories.is_empty() {
            return "No prior learnings for this context.".to_string();
        }
        let mut prompt = String::from("Learnings from previous runs:\n");
        for entry in &memories {
            prompt.push_str(&format!("- {}\n", entry.learning));
            if let Some(avoid) = &entry.action_to_avoid {
                prompt.push_str(&format!("  Avoid: {avoid}\n"));
            }
            if let Some(alternative) = &entry.alternative_action {
                prompt.push_str(&format!("  Instead: {alternative}\n"));
            }
        }
        prompt
    }

    /// Drops entries older than `days`, pruning emptied contexts.
    /// Returns how many entries were removed.
    pub async fn prune_older_than(&mut self, days: i64) -> usize {
        let cutoff = Utc::now() - Duration::days(days);
        let mut removed = 0;
        let mut emptied: Vec<String> = Vec::new();

        for (key, entries) in &mut self.store {
            let before = entries.len();
            entries.retain(|entry| entry.created_at >= cutoff);
            removed += before - entries.len();
            if entries.is_empty() {
                emptied.push(key.clone());
            }
        }
        for key in emptied {
            self.store.remove(&key);
            if let Some(repository) = &self.repository
                && let Err(e) = repository.remove_key(&key).await
            {
                warn!(key = %key, "failed to prune persisted memories: {e}");
            }
        }
        removed
    }

    pub fn context_count(&self) -> usize {
        self.store.len()
    }

    pub fn entry_count(&self) -> usize {
        self.store.values().map(Vec::len).sum()
    }
}

impl Default for MemoryService {
    fn default() -> Self {
        Self::new()
    }
}
