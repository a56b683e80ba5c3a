//! Catalog crawler stage action.

use super::{CatalogClient, CrawlOutcome, CrawlerState};
use crate::core::{StageResult, WorkflowPayload};
use crate::errors::CollaboratorError;
use crate::stages::StageAction;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Starts a crawler and polls it until it is idle again.
pub struct CrawlerAction {
    catalog: Arc<dyn CatalogClient>,
    crawler: String,
}

impl CrawlerAction {
    /// Creates an action driving the named crawler.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogClient>, crawler: impl Into<String>) -> Self {
        Self {
            catalog,
            crawler: crawler.into(),
        }
    }

    /// The crawler this action drives.
    #[must_use]
    pub fn crawler(&self) -> &str {
        &self.crawler
    }
}

impl fmt::Debug for CrawlerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlerAction")
            .field("crawler", &self.crawler)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StageAction for CrawlerAction {
    async fn start(&self, _payload: &WorkflowPayload) -> Result<StageResult, CollaboratorError> {
        self.catalog.start_crawler(&self.crawler).await?;
        tracing::debug!(crawler = %self.crawler, "Crawler started");
        Ok(StageResult::started())
    }

    async fn check(&self, _payload: &WorkflowPayload) -> Result<StageResult, CollaboratorError> {
        let snapshot = self.catalog.crawler_snapshot(&self.crawler).await?;
        if snapshot.state != CrawlerState::Ready {
            return Ok(StageResult::in_progress());
        }

        Ok(match snapshot.last_crawl {
            Some(CrawlOutcome::Succeeded) => StageResult::complete(),
            other => StageResult::failed(format!(
                "Error in Crawler. Crawler status: {}",
                other.map_or_else(|| "NONE".to_string(), |o| o.to_string())
            )),
        })
    }
}
