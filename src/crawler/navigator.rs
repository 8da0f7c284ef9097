//! List-page navigator
//!
//! Drives one rendering session through the search view: load, search,
//! scroll until lazy loading settles, snapshot, advance. Snapshots land in the
//! [`PageStore`] in increasing page order, and a restarted run jumps straight
//! to the page after the highest one already saved.

use tracing::{debug, info, trace, warn};

use super::retry::{Jitter, RetryPolicy};
use super::session::{ListSession, SessionError, SessionFactory, SessionSlot};
use crate::config::NavigatorConfig;
use crate::state::NavState;
use crate::storage::PageStore;
use crate::{CardError, Result};

/// "Next page" controls, in the order they are tried
pub const NEXT_PAGE_SELECTORS: [&str; 7] = [
    "li.ant-pagination-next:not(.ant-pagination-disabled) button",
    "li.ant-pagination-next:not(.ant-pagination-disabled) a",
    "a[aria-label='Next']",
    "button[aria-label='Next']",
    "li.next a",
    "button.next",
    "a.next",
];

/// Pause after each list-page scroll (base, spread in seconds)
const LIST_SCROLL_PACE: (f64, f64) = (0.6, 0.4);

/// What decides that scrolling has stopped revealing content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollProbe<'a> {
    /// `document.body.scrollHeight`
    DocumentHeight,
    /// Number of elements matching a selector
    Matches(&'a str),
}

async fn measure<S: ListSession + ?Sized>(
    session: &mut S,
    probe: ScrollProbe<'_>,
) -> std::result::Result<u64, SessionError> {
    match probe {
        ScrollProbe::DocumentHeight => session.document_height().await,
        ScrollProbe::Matches(selector) => Ok(session.count_matches(selector).await? as u64),
    }
}

/// Scrolls to the bottom until the probe is unchanged for `stable_rounds`
/// consecutive rounds, or `max_rounds` is reached
///
/// Returns the number of rounds performed.
pub async fn scroll_until_stable<S: ListSession + ?Sized>(
    session: &mut S,
    probe: ScrollProbe<'_>,
    max_rounds: u32,
    stable_rounds: u32,
    jitter: &Jitter,
    pace: (f64, f64),
) -> std::result::Result<u32, SessionError> {
    let mut last = measure(session, probe).await?;
    let mut stable = 0;

    for round in 1..=max_rounds {
        session.scroll_to_bottom().await?;
        jitter.sleep(pace.0, pace.1).await;

        let current = measure(session, probe).await?;
        if current == last {
            stable += 1;
        } else {
            stable = 0;
        }
        trace!(
            "Scroll {}: probe={}, stable={}/{}",
            round,
            current,
            stable,
            stable_rounds
        );
        last = current;

        if stable >= stable_rounds.max(1) {
            return Ok(round);
        }
    }

    Ok(max_rounds)
}

/// Clicks the first "next page" control that actually moves the active page
///
/// Falls back to the numbered link one past the active page. A click that
/// leaves the same page number active does not count.
pub async fn click_next<S: ListSession + ?Sized>(
    session: &mut S,
) -> std::result::Result<bool, SessionError> {
    let before = session.active_page_number().await?;

    for selector in NEXT_PAGE_SELECTORS {
        if session.click(selector).await? {
            if page_changed(session, before).await? {
                debug!("Advanced with {}", selector);
                return Ok(true);
            }
            debug!("Clicked {} but page {:?} is still active", selector, before);
        }
    }

    if let Some(current) = before {
        if session.click_page_number(current + 1).await? && page_changed(session, before).await? {
            debug!("Advanced with numbered link {}", current + 1);
            return Ok(true);
        }
    }

    Ok(false)
}

/// Whether the active page moved off `before`; an unreadable number counts as moved
async fn page_changed<S: ListSession + ?Sized>(
    session: &mut S,
    before: Option<u32>,
) -> std::result::Result<bool, SessionError> {
    let Some(from) = before else {
        return Ok(true);
    };
    Ok(session.wait_for_page_change(from).await? != Some(from))
}

/// Summary of a list crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavOutcome {
    /// Snapshots written, including re-saves after a refresh
    pub pages_saved: usize,
    /// Index of the last snapshot written
    pub last_page: Option<usize>,
    /// Whether the crawl ended on consecutive stalls
    pub stalled: bool,
    /// Session faults recovered from
    pub recoveries: u32,
}

enum Step {
    Advanced,
    Stalled,
    Finished,
}

fn transition(state: &mut NavState, next: NavState) {
    if !state.can_transition_to(next) {
        debug!("Unexpected navigator transition {} -> {}", state, next);
    }
    trace!("Navigator {} -> {}", state, next);
    *state = next;
}

/// Stateful list-page crawler
pub struct Navigator<F: SessionFactory> {
    slot: SessionSlot<F>,
    store: PageStore,
    start_url: String,
    config: NavigatorConfig,
    jitter: Jitter,
    state: NavState,
}

impl<F: SessionFactory> Navigator<F> {
    pub fn new(
        factory: F,
        store: PageStore,
        start_url: impl Into<String>,
        config: NavigatorConfig,
        jitter: Jitter,
    ) -> Self {
        Self {
            slot: SessionSlot::new(factory),
            store,
            start_url: start_url.into(),
            config,
            jitter,
            state: NavState::Idle,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// Crawls list pages until the stall limit, `max-pages`, or an
    /// unrecoverable session fault
    ///
    /// Only a failure to launch the first session or to write a snapshot is
    /// returned as an error.
    pub async fn run(&mut self) -> Result<NavOutcome> {
        let result = self.crawl().await;
        self.slot.release().await;
        if !self.state.is_terminal() {
            transition(&mut self.state, NavState::Done);
        }

        if let Ok(outcome) = &result {
            info!(
                "List crawl finished: {} pages saved, last page {:?}",
                outcome.pages_saved, outcome.last_page
            );
        }
        result
    }

    async fn crawl(&mut self) -> Result<NavOutcome> {
        let start_from = self.store.last_page_index()? + 1;

        self.load_start().await?;
        if start_from > 1 {
            info!("Resuming list crawl at page {}", start_from);
            self.jump_to(start_from).await?;
        }

        let mut outcome = NavOutcome::default();
        let mut page_index = start_from;
        let mut stalls = 0;
        let mut faulted_at: Option<usize> = None;

        loop {
            let error = match self.step(page_index, &mut outcome).await {
                Ok(Step::Finished) => {
                    info!("Reached the page limit after {} pages", outcome.pages_saved);
                    break;
                }
                Ok(Step::Advanced) => {
                    stalls = 0;
                    self.jitter.sleep(1.2, 0.8).await;
                    page_index += 1;
                    continue;
                }
                Ok(Step::Stalled) => {
                    stalls += 1;
                    if stalls >= self.config.max_consecutive_stalls {
                        info!(
                            "Pagination stalled {} times in a row at page {}; stopping",
                            stalls, page_index
                        );
                        outcome.stalled = true;
                        break;
                    }

                    warn!("Could not advance past page {}; refreshing", page_index);
                    match self.refresh().await {
                        Ok(()) => {
                            self.jitter.sleep(1.5, 1.0).await;
                            continue;
                        }
                        Err(e) => e,
                    }
                }
                Err(CardError::Session(e)) => e,
                Err(e) => return Err(e),
            };

            if !error.is_recoverable() {
                warn!("Ending list crawl at page {}: {}", page_index, error);
                break;
            }
            if faulted_at == Some(outcome.pages_saved) {
                warn!(
                    "Session failed again before another page was saved; ending list crawl: {}",
                    error
                );
                break;
            }
            faulted_at = Some(outcome.pages_saved);

            warn!("Session fault on page {}: {}", page_index, error);
            if let Err(e) = self.recover(page_index).await {
                warn!("Session recovery failed: {}", e);
                break;
            }
            outcome.recoveries += 1;
        }

        Ok(outcome)
    }

    /// Scroll, snapshot, save, then try to advance
    async fn step(&mut self, page_index: usize, outcome: &mut NavOutcome) -> Result<Step> {
        transition(&mut self.state, NavState::Scrolling);
        let session = self.slot.acquire().await?;

        scroll_until_stable(
            session,
            ScrollProbe::DocumentHeight,
            self.config.max_scroll_rounds,
            self.config.stable_rounds,
            &self.jitter,
            LIST_SCROLL_PACE,
        )
        .await?;

        let html = session.snapshot().await?;
        self.store.save_list_page(page_index, &html)?;
        outcome.pages_saved += 1;
        outcome.last_page = Some(page_index);
        info!("Fetched page {}", page_index);

        if let Some(max) = self.config.max_pages {
            if outcome.pages_saved >= max as usize {
                return Ok(Step::Finished);
            }
        }

        transition(&mut self.state, NavState::Paginating);
        let policy = RetryPolicy::pagination(self.config.advance_attempts, self.jitter);
        for attempt in policy.attempts() {
            if click_next(session).await? {
                transition(&mut self.state, NavState::Loaded);
                return Ok(Step::Advanced);
            }
            debug!("Next-page attempt {} failed on page {}", attempt + 1, page_index);
            policy.backoff(attempt).await;
        }

        transition(&mut self.state, NavState::Stalled);
        Ok(Step::Stalled)
    }

    /// Opens the start URL and triggers the search
    async fn load_start(&mut self) -> std::result::Result<(), SessionError> {
        let session = self.slot.acquire().await?;

        match session.open(&self.start_url).await {
            Ok(()) => {}
            Err(SessionError::Timeout(limit)) => {
                warn!("Start page still loading after {:?}; continuing", limit)
            }
            Err(e) => return Err(e),
        }
        transition(&mut self.state, NavState::Loaded);
        self.jitter.sleep(1.0, 0.6).await;

        if session.trigger_search().await? {
            transition(&mut self.state, NavState::Searched);
        } else {
            warn!("Search control not found; crawling the page as loaded");
        }
        Ok(())
    }

    /// Clicks the numbered link of `page`; a missing link is not an error
    async fn jump_to(&mut self, page: usize) -> std::result::Result<(), SessionError> {
        let session = self.slot.acquire().await?;
        transition(&mut self.state, NavState::Paginating);

        let number = u32::try_from(page).unwrap_or(u32::MAX);
        if session.click_page_number(number).await? {
            debug!("Jumped to page {}", page);
            self.jitter.sleep(1.2, 0.8).await;
        } else {
            warn!(
                "Page link {} not visible; continuing from the current page",
                page
            );
        }
        transition(&mut self.state, NavState::Loaded);
        Ok(())
    }

    /// Reloads the current page; a reload that outlasts the load timeout still counts
    async fn refresh(&mut self) -> std::result::Result<(), SessionError> {
        match self.slot.acquire().await?.refresh().await {
            Ok(()) => {}
            Err(SessionError::Timeout(limit)) => {
                warn!("Refreshed page still loading after {:?}; continuing", limit)
            }
            Err(e) => return Err(e),
        }
        transition(&mut self.state, NavState::Loaded);
        Ok(())
    }

    /// Replaces the session and returns to `page_index`
    async fn recover(&mut self, page_index: usize) -> std::result::Result<(), SessionError> {
        transition(&mut self.state, NavState::Idle);
        self.slot.recreate().await?;
        self.load_start().await?;
        if page_index > 1 {
            self.jump_to(page_index).await?;
        }
        Ok(())
    }
}
