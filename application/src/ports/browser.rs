//! Browser session port
//!
//! Defines the interface for driving a single browser page. One session
//! holds exactly one active page; adapters that juggle tabs still expose
//! only the active one here.

use async_trait::async_trait;
use thiserror::Error;
use webpilot_domain::{BrowserStorage, ElementSelector, PageUrl, Timeout};

/// Errors that can occur during browser operations
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Interaction failed: {0}")]
    InteractionFailed(String),

    #[error("Timed out waiting for: {0}")]
    Timeout(String),

    #[error("Session already closed")]
    SessionClosed,

    #[error("Other error: {0}")]
    Other(String),
}

/// What `wait_for_element` waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// Present in the DOM and visible
    Visible,
    /// Present in the DOM, visibility irrelevant
    Attached,
    /// No longer visible
    Hidden,
}

/// How much of the page `extract_content` reads.
#[derive(Debug, Clone)]
pub enum ExtractionScope {
    FullPage,
    VisibleText,
    Element(ElementSelector),
}

/// A live browser session
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Start the browser and open the first page
    async fn launch(&self, url: &PageUrl) -> Result<(), BrowserError>;

    /// Navigate the active page
    async fn goto(&self, url: &PageUrl) -> Result<(), BrowserError>;

    async fn click(&self, selector: &ElementSelector) -> Result<(), BrowserError>;

    /// Type into an input; `submit` presses Enter afterwards
    async fn fill(&self, selector: &ElementSelector, text: &str, submit: bool)
    -> Result<(), BrowserError>;

    async fn hover(&self, selector: &ElementSelector) -> Result<(), BrowserError>;

    async fn select_option(
        &self,
        selector: &ElementSelector,
        value: &str,
    ) -> Result<(), BrowserError>;

    async fn scroll_down(&self, pixels: u32) -> Result<(), BrowserError>;

    async fn scroll_up(&self, pixels: u32) -> Result<(), BrowserError>;

    async fn wait_for_element(
        &self,
        selector: &ElementSelector,
        condition: WaitCondition,
        timeout: Timeout,
    ) -> Result<(), BrowserError>;

    /// Read page content as structured JSON
    async fn extract_content(&self, scope: ExtractionScope)
    -> Result<serde_json::Value, BrowserError>;

    /// URL of the active page
    async fn page_url(&self) -> Result<PageUrl, BrowserError>;

    /// Cookies and web storage of the active page.
    ///
    /// Default is an empty snapshot so adapters without storage access
    /// still satisfy the port.
    async fn storage_snapshot(&self) -> Result<BrowserStorage, BrowserError> {
        Ok(BrowserStorage::default())
    }

    /// Close the page and release the browser
    async fn close(&self) -> Result<(), BrowserError>;
}
