//! Page interaction driver
//!
//! Given a live session, navigates to a product URL, emulates a human
//! reading pass over the page, classifies bot-defense responses, and
//! extracts structured fields. Retry policy is the orchestrator's job; the
//! driver only reports what it saw.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::services::{PageScrapeResult, ScrapeError};
use crate::infrastructure::product_extractor::ProductExtractor;
use crate::infrastructure::session::BrowserSession;

/// Settle time after each scroll pass, giving lazily-loaded content a
/// chance to populate before extraction.
const SCROLL_SETTLE: Duration = Duration::from_secs(2);

/// Responses that loaded a page but are themselves a bot-defense page.
/// A hit anywhere in the title or content marks the attempt soft-blocked.
const BLOCK_SIGNALS: &[&str] = &[
    "Access Denied",
    "503",
    "Service Unavailable",
    "Request blocked",
    "Request denied",
    "You are being rate limited",
    "rate limited",
    "Please try again later",
    "Too many requests",
    "We apologize for the inconvenience",
    "Server Busy",
];

const SCROLL_PASSES: &[&str] = &[
    "window.scrollTo(0, document.body.scrollHeight)",
    "window.scrollTo(0, document.body.scrollHeight / 2)",
    "window.scrollTo(0, 0)",
];

/// True when the text contains any known block signal.
pub fn is_soft_block(text: &str) -> bool {
    BLOCK_SIGNALS.iter().any(|signal| text.contains(signal))
}

pub struct PageDriver {
    extractor: ProductExtractor,
}

impl PageDriver {
    pub fn new(extractor: ProductExtractor) -> Self {
        Self { extractor }
    }

    /// Run one full scrape attempt against the session's page.
    ///
    /// Navigation deliberately has no own timeout ceiling - the
    /// orchestrator's per-job timeout is the real bound.
    pub async fn scrape(
        &self,
        session: &mut BrowserSession,
        url: &str,
    ) -> Result<PageScrapeResult, ScrapeError> {
        let page = session.page().ok_or(ScrapeError::PageClosed)?;

        debug!(session = %session.id, url, "navigating");
        page.goto(url).await.map_err(|e| ScrapeError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        page.wait_for_navigation()
            .await
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let title = page
            .get_title()
            .await
            .map_err(|e| ScrapeError::Evaluation(e.to_string()))?
            .unwrap_or_default();

        let landed_content = page
            .content()
            .await
            .map_err(|e| ScrapeError::Evaluation(e.to_string()))?;
        let soft_blocked = is_soft_block(&title) || is_soft_block(&landed_content);
        if soft_blocked {
            warn!(url, title = %title, "block signal on page, flagging attempt as soft-blocked");
        }

        // Bottom, midpoint, top - with settle delays so lazily-loaded
        // content is present before extraction. Behavioral emulation, not
        // decoration.
        for script in SCROLL_PASSES {
            page.evaluate(*script)
                .await
                .map_err(|e| ScrapeError::Evaluation(e.to_string()))?;
            sleep(SCROLL_SETTLE).await;
        }

        let html = page
            .content()
            .await
            .map_err(|e| ScrapeError::Evaluation(e.to_string()))?;
        let fields = self.extractor.extract(&html, &title);

        debug!(url, title = %title, soft_blocked, "scrape attempt finished");

        Ok(PageScrapeResult {
            url: url.to_string(),
            title,
            fields,
            soft_blocked,
        })
    }
}

impl Default for PageDriver {
    fn default() -> Self {
        Self::new(ProductExtractor::new())
    }
}
