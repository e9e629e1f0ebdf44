/*!
 * Per-provider request budgets.
 *
 * Every provider gets a rolling window of `max_requests` per `window`. The
 * limiter only answers "may I call now?"; deciding what to do on refusal is
 * up to the caller.
 */

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::Mutex;

/// Request budget for one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudget {
    /// Requests allowed inside one window
    pub max_requests: u32,
    /// Length of the rolling window
    pub window: Duration,
}

impl RateBudget {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self { max_requests, window }
    }

    /// Budget expressed as requests per minute
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }
}

#[derive(Debug)]
struct ProviderWindow {
    budget: RateBudget,
    /// Instants of requests still inside the window, oldest first
    issued: VecDeque<Instant>,
    /// Hard block set after a 429
    blocked_until: Option<Instant>,
}

impl ProviderWindow {
    fn new(budget: RateBudget) -> Self {
        Self {
            budget,
            issued: VecDeque::new(),
            blocked_until: None,
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.issued.front() {
            if now.saturating_duration_since(oldest) >= self.budget.window {
                self.issued.pop_front();
            } else {
                break;
            }
        }
        if self.blocked_until.is_some_and(|until| until <= now) {
            self.blocked_until = None;
        }
    }

    fn wait_time(&self, now: Instant) -> Option<Duration> {
        if let Some(until) = self.blocked_until {
            return Some(until.saturating_duration_since(now));
        }
        if (self.issued.len() as u32) < self.budget.max_requests {
            return None;
        }
        self.issued
            .front()
            .map(|&oldest| (oldest + self.budget.window).saturating_duration_since(now))
    }
}

/// Rolling-window limiter holding one window per provider
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, ProviderWindow>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the budget for `provider`, keeping its history
    pub fn configure(&self, provider: &str, budget: RateBudget) {
        let mut windows = self.windows.lock();
        match windows.get_mut(provider) {
            Some(window) => window.budget = budget,
            None => {
                windows.insert(provider.to_string(), ProviderWindow::new(budget));
            }
        }
    }

    /// Take one request slot; providers without a budget are unlimited
    pub fn try_acquire(&self, provider: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let Some(window) = windows.get_mut(provider) else {
            return true;
        };

        window.prune(now);
        if window.wait_time(now).is_some() {
            debug!("Rate limit budget exhausted for {}", provider);
            return false;
        }
        window.issued.push_back(now);
        true
    }

    /// How long until `try_acquire` could succeed; `None` means now
    pub fn time_until_available(&self, provider: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let window = windows.get_mut(provider)?;
        window.prune(now);
        window.wait_time(now)
    }

    /// Block `provider` for `duration`, typically from a `Retry-After` header
    pub fn penalize(&self, provider: &str, duration: Duration) {
        let until = Instant::now() + duration;
        let mut windows = self.windows.lock();
        let window = windows
            .entry(provider.to_string())
            .or_insert_with(|| ProviderWindow::new(RateBudget::new(u32::MAX, Duration::from_secs(1))));
        window.blocked_until = Some(window.blocked_until.map_or(until, |current| current.max(until)));
        debug!("Provider {} blocked for {:?}", provider, duration);
    }

    /// Requests remaining in the current window
    pub fn remaining(&self, provider: &str) -> Option<u32> {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let window = windows.get_mut(provider)?;
        window.prune(now);
        Some(window.budget.max_requests.saturating_sub(window.issued.len() as u32))
    }

    /// Forget history and blocks for every provider
    pub fn reset(&self) {
        for window in self.windows.lock().values_mut() {
            window.issued.clear();
            window.blocked_until = None;
        }
    }
}
