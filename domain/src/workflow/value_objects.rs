//! Workflow value objects — immutable, self-validating primitives used
//! throughout the engine.
//!
//! # Identifiers
//! - [`WorkflowId`], [`PlanId`], [`StepId`], [`TaskId`], [`SessionId`]
//!
//! # Execution primitives
//! - [`Confidence`] — 0–100 score attached to steps and evidence
//! - [`Priority`] — dequeue bias for tasks
//! - [`TaskIntent`] / [`StrategicIntent`] — concrete vs. planner-level actions
//! - [`RetryPolicy`], [`Timeout`] — failure-handling knobs
//! - [`PageUrl`], [`Viewport`], [`ElementSelector`] — browser-facing values

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Unique identifier for a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(String);

impl WorkflowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for WorkflowId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a plan (one per execution attempt; replaced on replan).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for PlanId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a strategic step within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for StepId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a concrete browser task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for TaskId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a browser-automation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for SessionId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A confidence score in percent (0–100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Confidence(u8);

impl Confidence {
    /// Creates a confidence score, rejecting values above 100.
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value > 100 {
            return Err(DomainError::InvalidConfidence(value));
        }
        Ok(Self(value as u8))
    }

    /// Creates a confidence score, clamping out-of-range values to 100.
    ///
    /// Planner output is untrusted; clamping keeps a malformed score from
    /// failing plan conversion.
    pub fn clamped(value: u32) -> Self {
        Self(value.min(100) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self(50)
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Dequeue priority for tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Sort key: lower rank dequeues first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A concrete, directly executable browser action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskIntent {
    Click,
    Fill,
    Type,
    Navigate,
    Extract,
    Verify,
    Scroll,
    Hover,
    Select,
    Wait,
}

impl TaskIntent {
    pub fn as_str(&self) -> &str {
        match self {
            TaskIntent::Click => "click",
            TaskIntent::Fill => "fill",
            TaskIntent::Type => "type",
            TaskIntent::Navigate => "navigate",
            TaskIntent::Extract => "extract",
            TaskIntent::Verify => "verify",
            TaskIntent::Scroll => "scroll",
            TaskIntent::Hover => "hover",
            TaskIntent::Select => "select",
            TaskIntent::Wait => "wait",
        }
    }

    /// `true` for intents that touch a specific element on the page.
    pub fn interacts_with_element(&self) -> bool {
        matches!(
            self,
            TaskIntent::Click
                | TaskIntent::Fill
                | TaskIntent::Type
                | TaskIntent::Hover
                | TaskIntent::Select
        )
    }
}

impl std::str::FromStr for TaskIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "click" => Ok(TaskIntent::Click),
            "fill" => Ok(TaskIntent::Fill),
            "type" => Ok(TaskIntent::Type),
            "navigate" => Ok(TaskIntent::Navigate),
            "extract" => Ok(TaskIntent::Extract),
            "verify" => Ok(TaskIntent::Verify),
            "scroll" => Ok(TaskIntent::Scroll),
            "hover" => Ok(TaskIntent::Hover),
            "select" => Ok(TaskIntent::Select),
            "wait" => Ok(TaskIntent::Wait),
            other => Err(format!("unknown task intent: {other}")),
        }
    }
}

impl std::fmt::Display for TaskIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A planner-level, human-scale intent (e.g. "search", "authenticate").
///
/// Strategic intents are what the planner speaks; they map onto concrete
/// [`TaskIntent`]s through a fixed lookup table. Intents the table does not
/// know are preserved verbatim in [`StrategicIntent::Unknown`] so the caller
/// can apply its configured fallback and warn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StrategicIntent {
    Search,
    Filter,
    Interact,
    Authenticate,
    Navigate,
    Extract,
    Verify,
    Unknown(String),
}

impl StrategicIntent {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "search" => StrategicIntent::Search,
            "filter" => StrategicIntent::Filter,
            "interact" => StrategicIntent::Interact,
            "authenticate" => StrategicIntent::Authenticate,
            "navigate" => StrategicIntent::Navigate,
            "extract" => StrategicIntent::Extract,
            "verify" => StrategicIntent::Verify,
            other => StrategicIntent::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StrategicIntent::Search => "search",
            StrategicIntent::Filter => "filter",
            StrategicIntent::Interact => "interact",
            StrategicIntent::Authenticate => "authenticate",
            StrategicIntent::Navigate => "navigate",
            StrategicIntent::Extract => "extract",
            StrategicIntent::Verify => "verify",
            StrategicIntent::Unknown(s) => s,
        }
    }

    /// Fixed strategic → concrete intent lookup table.
    ///
    /// Returns `None` for [`StrategicIntent::Unknown`]; the caller decides
    /// the fallback.
    pub fn to_task_intent(&self) -> Option<TaskIntent> {
        match self {
            StrategicIntent::Search => Some(TaskIntent::Type),
            StrategicIntent::Filter => Some(TaskIntent::Click),
            StrategicIntent::Interact => Some(TaskIntent::Click),
            StrategicIntent::Authenticate => Some(TaskIntent::Fill),
            StrategicIntent::Navigate => Some(TaskIntent::Navigate),
            StrategicIntent::Extract => Some(TaskIntent::Extract),
            StrategicIntent::Verify => Some(TaskIntent::Verify),
            StrategicIntent::Unknown(_) => None,
        }
    }
}

impl From<String> for StrategicIntent {
    fn from(s: String) -> Self {
        StrategicIntent::parse(&s)
    }
}

impl From<StrategicIntent> for String {
    fn from(intent: StrategicIntent) -> Self {
        intent.as_str().to_string()
    }
}

impl std::fmt::Display for StrategicIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bounded-retry policy for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Linear backoff delay before the given retry attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        std::time::Duration::from_millis(self.backoff_base_ms * u64::from(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1_000,
        }
    }
}

/// Per-task timeout in milliseconds. Must be non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeout(u64);

impl Timeout {
    pub const DEFAULT_MS: u64 = 30_000;

    pub fn from_millis(ms: u64) -> Result<Self, DomainError> {
        if ms == 0 {
            return Err(DomainError::InvalidTimeout);
        }
        Ok(Self(ms))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.0)
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self(Self::DEFAULT_MS)
    }
}

impl std::fmt::Display for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// A validated absolute http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageUrl(Url);

impl PageUrl {
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let url = Url::parse(input).map_err(|e| DomainError::InvalidUrl {
            url: input.to_string(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            other => Err(DomainError::InvalidUrl {
                url: input.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Host name, used to scope memory contexts per site.
    pub fn hostname(&self) -> &str {
        self.0.host_str().unwrap_or("unknown")
    }
}

impl TryFrom<String> for PageUrl {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<PageUrl> for String {
    fn from(url: PageUrl) -> Self {
        url.0.into()
    }
}

impl std::fmt::Display for PageUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Browser viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Result<Self, DomainError> {
        if width == 0 || height == 0 {
            return Err(DomainError::InvalidViewport { width, height });
        }
        Ok(Self { width, height })
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How a task addresses an element on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementSelector {
    /// CSS selector, e.g. `button[type=submit]`
    Css(String),
    /// XPath expression
    XPath(String),
    /// Index into the perceived interactive-element list
    Index(u32),
}

impl ElementSelector {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    pub fn index(i: u32) -> Self {
        Self::Index(i)
    }
}

impl std::fmt::Display for ElementSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementSelector::Css(s) => write!(f, "css:{s}"),
            ElementSelector::XPath(s) => write!(f, "xpath:{s}"),
            ElementSelector::Index(i) => write!(f, "index:{i}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generation_is_unique() {
        let a = WorkflowId::generate();
        let b = WorkflowId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_id_from_string() {
        let id: TaskId = "task-1".into();
        assert_eq!(id.as_str(), "task-1");
    }

    #[test]
    fn test_confidence_bounds() {
        assert!(Confidence::new(0).is_ok());
        assert!(Confidence::new(100).is_ok());
        assert!(Confidence::new(101).is_err());
        assert_eq!(Confidence::clamped(250).value(), 100);
    }

    #[test]
    fn test_priority_rank_order() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_intent_mapping_table() {
        assert_eq!(
            StrategicIntent::Search.to_task_intent(),
            Some(TaskIntent::Type)
        );
        assert_eq!(
            StrategicIntent::Filter.to_task_intent(),
            Some(TaskIntent::Click)
        );
        assert_eq!(
            StrategicIntent::Interact.to_task_intent(),
            Some(TaskIntent::Click)
        );
        assert_eq!(
            StrategicIntent::Authenticate.to_task_intent(),
            Some(TaskIntent::Fill)
        );
        assert_eq!(
            StrategicIntent::Navigate.to_task_intent(),
            Some(TaskIntent::Navigate)
        );
        assert_eq!(
            StrategicIntent::Extract.to_task_intent(),
            Some(TaskIntent::Extract)
        );
        assert_eq!(
            StrategicIntent::Verify.to_task_intent(),
            Some(TaskIntent::Verify)
        );
    }

    #[test]
    fn test_unknown_intent_has_no_mapping() {
        let intent = StrategicIntent::parse("teleport");
        assert_eq!(intent, StrategicIntent::Unknown("teleport".to_string()));
        assert_eq!(intent.to_task_intent(), None);
    }

    #[test]
    fn test_timeout_rejects_zero() {
        assert!(Timeout::from_millis(0).is_err());
        assert_eq!(Timeout::default().as_millis(), 30_000);
    }

    #[test]
    fn test_page_url_validation() {
        let url = PageUrl::parse("https://shop.example.com/search?q=x").unwrap();
        assert_eq!(url.hostname(), "shop.example.com");

        assert!(PageUrl::parse("ftp://example.com").is_err());
        assert!(PageUrl::parse("not a url").is_err());
    }

    #[test]
    fn test_viewport_validation() {
        assert!(Viewport::new(0, 720).is_err());
        let v = Viewport::default();
        assert_eq!((v.width, v.height), (1280, 720));
    }

    #[test]
    fn test_selector_display() {
        assert_eq!(ElementSelector::css("#main").to_string(), "css:#main");
        assert_eq!(ElementSelector::index(3).to_string(), "index:3");
    }

    #[test]
    fn test_retry_policy_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(
            policy.delay_for_attempt(2),
            std::time::Duration::from_millis(2_000)
        );
    }
}
