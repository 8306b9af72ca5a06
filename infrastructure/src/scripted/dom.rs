//! Static DOM service — canned page snapshots keyed by URL.

use super::browser::StaticBrowser;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use webpilot_application::ports::perception::{
    DomService, InteractiveElement, PageSnapshot, PerceptionError,
};
use webpilot_domain::{ElementSelector, PageUrl};

/// [`DomService`] that perceives whatever the [`StaticBrowser`] says is the
/// active page.
///
/// Specific URLs can carry scripted snapshots; everything else gets a
/// generic page derived from the URL, so state tracking and drift detection
/// see plausible, stable content.
pub struct StaticDomService {
    browser: Arc<StaticBrowser>,
    pages: HashMap<String, PageSnapshot>,
}

impl StaticDomService {
    pub fn new(browser: Arc<StaticBrowser>) -> Self {
        Self {
            browser,
            pages: HashMap::new(),
        }
    }

    /// Script the snapshot perceived at an exact URL.
    pub fn with_page(mut self, url: impl Into<String>, snapshot: PageSnapshot) -> Self {
        self.pages.insert(url.into(), snapshot);
        self
    }

    fn generic_snapshot(url: &PageUrl) -> PageSnapshot {
        PageSnapshot {
            url: url.as_str().to_string(),
            title: url.hostname().to_string(),
            elements: vec![
                InteractiveElement {
                    index: 1,
                    selector: ElementSelector::css("main a"),
                    tag: "a".to_string(),
                    label: "Continue".to_string(),
                },
                InteractiveElement {
                    index: 2,
                    selector: ElementSelector::css("#search"),
                    tag: "input".to_string(),
                    label: "Search".to_string(),
                },
            ],
            visible_sections: vec![
                "header".to_string(),
                "main".to_string(),
                "footer".to_string(),
            ],
            available_actions: vec![
                "navigate".to_string(),
                "search".to_string(),
                "extract".to_string(),
            ],
            pristine_screenshot: None,
            highlighted_screenshot: None,
        }
    }
}

#[async_trait]
impl DomService for StaticDomService {
    async fn perceive(&self) -> Result<PageSnapshot, PerceptionError> {
        let url = self
            .browser
            .current_url()
            .ok_or_else(|| PerceptionError::CaptureFailed("no active page".to_string()))?;
        Ok(self
            .pages
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| Self::generic_snapshot(&url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpilot_application::Browser;

    #[tokio::test]
    async fn test_perceive_requires_an_active_page() {
        let browser = Arc::new(StaticBrowser::new());
        let dom = StaticDomService::new(browser);
        assert!(matches!(
            dom.perceive().await,
            Err(PerceptionError::CaptureFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_generic_snapshot_follows_the_active_url() {
        let browser = Arc::new(StaticBrowser::new());
        let dom = StaticDomService::new(browser.clone());

        browser
            .launch(&PageUrl::parse("https://shop.example.com/search").unwrap())
            .await
            .unwrap();

        let snapshot = dom.perceive().await.unwrap();
        assert_eq!(snapshot.url, "https://shop.example.com/search");
        assert_eq!(snapshot.title, "shop.example.com");
        assert!(!snapshot.elements.is_empty());
        assert!(snapshot.visible_sections.contains(&"main".to_string()));
    }

    #[tokio::test]
    async fn test_scripted_page_overrides_the_generic_one() {
        let browser = Arc::new(StaticBrowser::new());
        let url = "https://shop.example.com/results";
        let dom = StaticDomService::new(browser.clone()).with_page(
            url,
            PageSnapshot {
                url: url.to_string(),
                title: "Results".to_string(),
                visible_sections: vec!["results".to_string()],
                available_actions: vec!["open-product".to_string()],
                ..Default::default()
            },
        );

        browser.launch(&PageUrl::parse(url).unwrap()).await.unwrap();

        let snapshot = dom.perceive().await.unwrap();
        assert_eq!(snapshot.title, "Results");
        assert_eq!(snapshot.available_actions, vec!["open-product"]);
    }
}
