//! Static browser — a browser that never leaves the process.

use async_trait::async_trait;
use std::sync::Mutex;
use webpilot_application::ports::browser::{
    Browser, BrowserError, ExtractionScope, WaitCondition,
};
use webpilot_domain::{ElementSelector, PageUrl, Timeout};

/// [`Browser`] adapter with no real browser behind it.
///
/// Tracks the active URL so navigation, perception and drift detection
/// behave consistently; every interaction succeeds without side effects.
#[derive(Default)]
pub struct StaticBrowser {
    current: Mutex<Option<PageUrl>>,
}

impl StaticBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL of the active page, if a session is open.
    pub fn current_url(&self) -> Option<PageUrl> {
        self.current.lock().ok().and_then(|current| current.clone())
    }

    fn set_current(&self, url: Option<PageUrl>) -> Result<(), BrowserError> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| BrowserError::Other("page lock poisoned".to_string()))?;
        *current = url;
        Ok(())
    }
}

#[async_trait]
impl Browser for StaticBrowser {
    async fn launch(&self, url: &PageUrl) -> Result<(), BrowserError> {
        self.set_current(Some(url.clone()))
    }

    async fn goto(&self, url: &PageUrl) -> Result<(), BrowserError> {
        self.set_current(Some(url.clone()))
    }

    async fn click(&self, _selector: &ElementSelector) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn fill(
        &self,
        _selector: &ElementSelector,
        _text: &str,
        _submit: bool,
    ) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn hover(&self, _selector: &ElementSelector) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn select_option(
        &self,
        _selector: &ElementSelector,
        _value: &str,
    ) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn scroll_down(&self, _pixels: u32) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn scroll_up(&self, _pixels: u32) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn wait_for_element(
        &self,
        _selector: &ElementSelector,
        _condition: WaitCondition,
        _timeout: Timeout,
    ) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn extract_content(
        &self,
        _scope: ExtractionScope,
    ) -> Result<serde_json::Value, BrowserError> {
        let url = self.current_url().ok_or(BrowserError::SessionClosed)?;
        Ok(serde_json::json!({ "url": url.as_str(), "content": "static page" }))
    }

    async fn page_url(&self) -> Result<PageUrl, BrowserError> {
        self.current_url().ok_or(BrowserError::SessionClosed)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.set_current(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_navigation_tracks_the_active_url() {
        let browser = StaticBrowser::new();
        assert!(matches!(
            browser.page_url().await,
            Err(BrowserError::SessionClosed)
        ));

        let home = PageUrl::parse("https://shop.example.com").unwrap();
        browser.launch(&home).await.unwrap();
        assert_eq!(browser.page_url().await.unwrap(), home);

        let search = PageUrl::parse("https://shop.example.com/search").unwrap();
        browser.goto(&search).await.unwrap();
        assert_eq!(browser.page_url().await.unwrap(), search);

        browser.close().await.unwrap();
        assert!(browser.current_url().is_none());
    }

    #[tokio::test]
    async fn test_interactions_succeed_without_a_page_change() {
        let browser = StaticBrowser::new();
        let url = PageUrl::parse("https://shop.example.com").unwrap();
        browser.launch(&url).await.unwrap();

        let selector = ElementSelector::css("#search");
        browser.click(&selector).await.unwrap();
        browser.fill(&selector, "wireless headphones", true).await.unwrap();
        browser.scroll_down(400).await.unwrap();

        assert_eq!(browser.page_url().await.unwrap(), url);
    }
}
