//! Cascading element resolution.
//!
//! A catalogue is interpreted in order and the first strategy that yields a
//! visible, enabled element wins, even if a later strategy would also match.
//! Query failures count as misses; only fatal driver errors escape.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::browser::{BrowserError, BrowserHandle, ElementHandle};
use crate::types::{NodeKey, Role, SelectorStrategy};

/// Floor for the pause between passes, so a zero poll interval cannot spin.
const MIN_POLL: Duration = Duration::from_millis(10);

/// A usable element plus the strategy that found it. Owned by one resolution
/// call; callers keep at most its `NodeKey`.
pub struct ElementCandidate<E> {
    pub handle: E,
    pub strategy: SelectorStrategy,
    pub visible: bool,
    pub enabled: bool,
}

impl<E: ElementHandle> ElementCandidate<E> {
    pub fn node_key(&self) -> NodeKey {
        self.handle.node_key()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ElementResolver {
    /// Pause between passes over the catalogue while the deadline allows.
    pub poll_interval: Duration,
    pub scroll_into_view: bool,
}

impl Default for ElementResolver {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            scroll_into_view: true,
        }
    }
}

impl ElementResolver {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Self::default()
        }
    }

    /// First visible and enabled match for `role` within `timeout`.
    pub fn resolve<'b, B: BrowserHandle>(
        &self,
        browser: &'b B,
        role: Role,
        catalogue: &[SelectorStrategy],
        timeout: Duration,
    ) -> Result<Option<ElementCandidate<B::Element<'b>>>, BrowserError> {
        self.resolve_where(browser, role, catalogue, timeout, |_| true)
    }

    /// Like [`resolve`](Self::resolve), but candidates must also satisfy
    /// `accept`. The timeout spans the whole catalogue; at least one full pass
    /// is always made.
    pub fn resolve_where<'b, B, F>(
        &self,
        browser: &'b B,
        role: Role,
        catalogue: &[SelectorStrategy],
        timeout: Duration,
        mut accept: F,
    ) -> Result<Option<ElementCandidate<B::Element<'b>>>, BrowserError>
    where
        B: BrowserHandle,
        F: FnMut(&B::Element<'b>) -> bool,
    {
        let started = Instant::now();
        loop {
            for strategy in catalogue {
                let matches = match browser.find_all(strategy) {
                    Ok(m) => m,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        debug!(%role, %strategy, error = %e, "query failed, treating as miss");
                        continue;
                    }
                };

                let hit = matches
                    .into_iter()
                    .find(|el| el.is_visible() && el.is_enabled() && accept(el));

                if let Some(handle) = hit {
                    debug!(%role, %strategy, "resolved");
                    if self.scroll_into_view {
                        if let Err(e) = handle.scroll_into_view() {
                            if e.is_fatal() {
                                return Err(e);
                            }
                            warn!(%role, error = %e, "scroll into view failed");
                        }
                    }
                    return Ok(Some(ElementCandidate {
                        handle,
                        strategy: *strategy,
                        visible: true,
                        enabled: true,
                    }));
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                debug!(%role, ?elapsed, "catalogue exhausted");
                return Ok(None);
            }
            thread::sleep(self.poll_interval.max(MIN_POLL).min(timeout - elapsed));
        }
    }
}
