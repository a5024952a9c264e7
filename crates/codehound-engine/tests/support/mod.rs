//! Scripted browser doubles shared by the engine integration tests.
//!
//! Pages are scripted per URL substring; every session and page open/close
//! is recorded in a [`Ledger`] so tests can assert resource safety.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use codehound_core::{CandidateOrigin, CouponCandidate, SourceId};
use codehound_engine::{
    AdapterError, BrowserDriver, BrowserSession, CouponSource, DiscoveryError, PageContext,
    PageError, PopupWatch,
};
use tokio::sync::oneshot;

#[derive(Debug, Default)]
pub struct Ledger {
    pub acquire_calls: AtomicUsize,
    pub sessions_opened: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub clicks: AtomicUsize,
}

impl Ledger {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Every session and page that was opened has been closed exactly once.
    pub fn assert_balanced(&self) {
        assert_eq!(
            Self::get(&self.sessions_opened),
            Self::get(&self.sessions_closed),
            "sessions left open"
        );
        assert_eq!(
            Self::get(&self.pages_opened),
            Self::get(&self.pages_closed),
            "pages left open"
        );
    }
}

#[derive(Debug, Clone)]
pub enum PopupScript {
    /// Clicking the reveal control opens a tab showing `code`.
    Opens(String),
    /// Clicking opens a tab whose code holder never renders.
    OpensStalled,
    /// Clicking does nothing.
    Never,
}

#[derive(Debug, Clone)]
pub struct PageScript {
    /// Returned by `outer_html` for any selector. Empty means the card
    /// selector never appears.
    pub cards: Vec<String>,
    pub visible_text: Vec<String>,
    pub goto_delay: Option<Duration>,
    pub popup: PopupScript,
}

impl PageScript {
    pub fn cards(cards: &[&str]) -> Self {
        Self {
            cards: cards.iter().map(|c| (*c).to_string()).collect(),
            ..Self::blank()
        }
    }

    pub fn text(nodes: &[&str]) -> Self {
        Self {
            visible_text: nodes.iter().map(|n| (*n).to_string()).collect(),
            ..Self::blank()
        }
    }

    pub fn blank() -> Self {
        Self {
            cards: Vec::new(),
            visible_text: Vec::new(),
            goto_delay: None,
            popup: PopupScript::Never,
        }
    }

    #[must_use]
    pub fn with_popup(mut self, popup: PopupScript) -> Self {
        self.popup = popup;
        self
    }

    #[must_use]
    pub fn with_goto_delay(mut self, delay: Duration) -> Self {
        self.goto_delay = Some(delay);
        self
    }
}

type Routes = Arc<Vec<(String, PageScript)>>;

/// Browser driver whose pages follow [`PageScript`]s.
#[derive(Clone)]
pub struct FakeBrowser {
    ledger: Arc<Ledger>,
    routes: Routes,
    fail_launch: bool,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(Ledger::default()),
            routes: Arc::new(Vec::new()),
            fail_launch: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::new()
        }
    }

    /// Pages whose URL contains `pattern` follow `script`. First match wins.
    #[must_use]
    pub fn route(mut self, pattern: &str, script: PageScript) -> Self {
        Arc::make_mut(&mut self.routes).push((pattern.to_string(), script));
        self
    }

    pub fn ledger(&self) -> Arc<Ledger> {
        Arc::clone(&self.ledger)
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn acquire_session(&self) -> Result<Box<dyn BrowserSession>, DiscoveryError> {
        self.ledger.acquire_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(DiscoveryError::BrowserLaunch(
                "remote browser token is not configured".to_string(),
            ));
        }
        self.ledger.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            ledger: Arc::clone(&self.ledger),
            routes: Arc::clone(&self.routes),
            closed: AtomicBool::new(false),
        }))
    }
}

struct FakeSession {
    ledger: Arc<Ledger>,
    routes: Routes,
    closed: AtomicBool,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn open_page(&self) -> Result<Box<dyn PageContext>, PageError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PageError::Closed);
        }
        Ok(Box::new(FakePage::new(
            Arc::clone(&self.ledger),
            Arc::clone(&self.routes),
            None,
        )))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.ledger.sessions_closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

type PopupSender = oneshot::Sender<Box<dyn PageContext>>;

struct FakePage {
    ledger: Arc<Ledger>,
    routes: Routes,
    url: Mutex<String>,
    closed: AtomicBool,
    /// Set on popup pages: the code their holder element shows.
    popup_code: Option<String>,
    /// Popup page whose selector waits never finish.
    stalled: bool,
    pending_popup: Mutex<Option<PopupSender>>,
    /// Senders for popups that never open, kept alive so watchers time out.
    parked: Mutex<Vec<PopupSender>>,
}

impl FakePage {
    fn new(ledger: Arc<Ledger>, routes: Routes, popup_code: Option<String>) -> Self {
        ledger.pages_opened.fetch_add(1, Ordering::SeqCst);
        Self {
            ledger,
            routes,
            url: Mutex::new("about:blank".to_string()),
            closed: AtomicBool::new(false),
            popup_code,
            stalled: false,
            pending_popup: Mutex::new(None),
            parked: Mutex::new(Vec::new()),
        }
    }

    fn script(&self) -> Option<PageScript> {
        let url = self.url.lock().unwrap().clone();
        self.routes
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, script)| script.clone())
    }

    fn ensure_open(&self) -> Result<(), PageError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(PageError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageContext for FakePage {
    async fn goto(&self, url: &str) -> Result<(), PageError> {
        self.ensure_open()?;
        *self.url.lock().unwrap() = url.to_string();
        if let Some(delay) = self.script().and_then(|s| s.goto_delay) {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), PageError> {
        self.ensure_open()?;
        if self.stalled {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let present = self.popup_code.is_some()
            || self.script().is_some_and(|s| !s.cards.is_empty());
        if present {
            Ok(())
        } else {
            Err(PageError::SelectorNotFound {
                selector: selector.to_string(),
                waited_ms: u64::try_from(timeout.as_millis()).unwrap(),
            })
        }
    }

    async fn outer_html(&self, _selector: &str, limit: usize) -> Result<Vec<String>, PageError> {
        self.ensure_open()?;
        Ok(self
            .script()
            .map(|s| s.cards.into_iter().take(limit).collect())
            .unwrap_or_default())
    }

    async fn visible_text(&self) -> Result<Vec<String>, PageError> {
        self.ensure_open()?;
        Ok(self.script().map(|s| s.visible_text).unwrap_or_default())
    }

    async fn text_of(&self, _selector: &str) -> Result<Option<String>, PageError> {
        self.ensure_open()?;
        Ok(self.popup_code.clone())
    }

    async fn click(&self, _selector: &str, _index: usize) -> Result<(), PageError> {
        self.ensure_open()?;
        self.ledger.clicks.fetch_add(1, Ordering::SeqCst);
        let Some(sender) = self.pending_popup.lock().unwrap().take() else {
            return Ok(());
        };
        match self.script().map(|s| s.popup) {
            Some(PopupScript::Opens(code)) => {
                let popup = FakePage::new(
                    Arc::clone(&self.ledger),
                    Arc::clone(&self.routes),
                    Some(code),
                );
                if let Err(unclaimed) = sender.send(Box::new(popup)) {
                    unclaimed.close().await;
                }
            }
            Some(PopupScript::OpensStalled) => {
                let mut popup = FakePage::new(
                    Arc::clone(&self.ledger),
                    Arc::clone(&self.routes),
                    Some("NEVERSEEN".to_string()),
                );
                popup.stalled = true;
                if let Err(unclaimed) = sender.send(Box::new(popup)) {
                    unclaimed.close().await;
                }
            }
            Some(PopupScript::Never) | None => self.parked.lock().unwrap().push(sender),
        }
        Ok(())
    }

    async fn bring_to_front(&self) -> Result<(), PageError> {
        self.ensure_open()
    }

    async fn watch_popup(&self) -> Result<PopupWatch, PageError> {
        self.ensure_open()?;
        let (sender, receiver) = oneshot::channel();
        *self.pending_popup.lock().unwrap() = Some(sender);
        Ok(PopupWatch::new(async move {
            receiver.await.map_err(|_| PageError::Closed)
        }))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.ledger.pages_closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Source double that returns fixed candidates and counts invocations.
pub struct CountingSource {
    id: SourceId,
    codes: Vec<(String, bool, u8)>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl CountingSource {
    pub fn new(id: SourceId, codes: &[(&str, bool, u8)]) -> Self {
        Self {
            id,
            codes: codes
                .iter()
                .map(|(code, verified, pct)| ((*code).to_string(), *verified, *pct))
                .collect(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleeps this long before answering.
    #[must_use]
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CouponSource for CountingSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn uses_fallback(&self) -> bool {
        false
    }

    fn listing_url(&self, search_key: &str) -> String {
        format!("https://{}.test/{search_key}", self.id)
    }

    async fn extract(
        &self,
        page: &dyn PageContext,
        search_key: &str,
    ) -> Result<Vec<CouponCandidate>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        page.goto(&self.listing_url(search_key)).await?;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .codes
            .iter()
            .map(|(code, verified, pct)| CouponCandidate {
                code: code.clone(),
                description: String::new(),
                source: self.id,
                verified: *verified,
                discount_percent: *pct,
                expiry: None,
                origin: CandidateOrigin::Structured,
            })
            .collect())
    }
}
