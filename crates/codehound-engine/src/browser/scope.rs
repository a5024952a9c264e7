//! Per-invocation page accounting.
//!
//! An adapter future can be dropped at any await point when its budget runs
//! out, taking any popup it holds with it. A [`PageScope`] hands the adapter
//! a wrapped page whose popups are also registered here, so the runner can
//! close them after the bounded future has ended, whichever way it ended.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{PageContext, PopupWatch};
use crate::error::PageError;

type Popups = Arc<Mutex<Vec<Arc<dyn PageContext>>>>;

#[derive(Default)]
pub(crate) struct PageScope {
    popups: Popups,
}

impl PageScope {
    /// Wraps `page` so popups it opens are recorded in this scope.
    pub(crate) fn track<'a>(&self, page: &'a dyn PageContext) -> ScopedPage<'a> {
        ScopedPage {
            page: Handle::Borrowed(page),
            popups: Arc::clone(&self.popups),
        }
    }

    /// Closes every popup opened through this scope. Returns how many were
    /// tracked; closing an already closed page is a no-op.
    pub(crate) async fn close_popups(&self) -> usize {
        let popups = std::mem::take(&mut *self.popups.lock().unwrap_or_else(PoisonError::into_inner));
        for popup in &popups {
            popup.close().await;
        }
        popups.len()
    }
}

enum Handle<'a> {
    Borrowed(&'a dyn PageContext),
    Shared(Arc<dyn PageContext>),
}

impl Handle<'_> {
    fn get(&self) -> &dyn PageContext {
        match self {
            Handle::Borrowed(page) => *page,
            Handle::Shared(page) => page.as_ref(),
        }
    }
}

pub(crate) struct ScopedPage<'a> {
    page: Handle<'a>,
    popups: Popups,
}

#[async_trait]
impl PageContext for ScopedPage<'_> {
    async fn goto(&self, url: &str) -> Result<(), PageError> {
        self.page.get().goto(url).await
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), PageError> {
        self.page.get().wait_for_selector(selector, timeout).await
    }

    async fn outer_html(&self, selector: &str, limit: usize) -> Result<Vec<String>, PageError> {
        self.page.get().outer_html(selector, limit).await
    }

    async fn visible_text(&self) -> Result<Vec<String>, PageError> {
        self.page.get().visible_text().await
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>, PageError> {
        self.page.get().text_of(selector).await
    }

    async fn click(&self, selector: &str, index: usize) -> Result<(), PageError> {
        self.page.get().click(selector, index).await
    }

    async fn bring_to_front(&self) -> Result<(), PageError> {
        self.page.get().bring_to_front().await
    }

    async fn watch_popup(&self) -> Result<PopupWatch, PageError> {
        let watch = self.page.get().watch_popup().await?;
        let popups = Arc::clone(&self.popups);

        Ok(PopupWatch::new(async move {
            let popup: Arc<dyn PageContext> = Arc::from(watch.opened.await?);
            // Recorded before the next await so a drop cannot lose it.
            popups
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Arc::clone(&popup));
            Ok(Box::new(ScopedPage {
                page: Handle::Shared(popup),
                popups,
            }) as Box<dyn PageContext>)
        }))
    }

    async fn close(&self) {
        self.page.get().close().await;
    }
}
