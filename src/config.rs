use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::retry::RetryPolicy;
use crate::types::{DEFAULT_START_URL, PROMPT_ATTEMPTS};

pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";

/// True on the hosted deployments, where there is no speaker, microphone or
/// display.
pub fn is_production_env() -> bool {
    std::env::var("RAILWAY_ENVIRONMENT").is_ok_and(|v| v == "production")
        || std::env::var("RENDER").is_ok_and(|v| v == "true")
}

/// Every wait in the booking flow. All are blocking sleeps on the run's own
/// thread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowTimings {
    pub home_settle: Duration,
    pub after_click: Duration,
    pub input_reveal: Duration,
    pub suggestion_load: Duration,
    pub after_confirm: Duration,
    pub login_poll_interval: Duration,
    pub login_max_polls: u32,
    /// Budget for one catalogue, across all of its strategies.
    pub resolve_timeout: Duration,
    pub resolve_poll: Duration,
    pub listen_timeout: Duration,
    pub phrase_limit: Duration,
    pub prompt_attempts: usize,
}

impl Default for FlowTimings {
    fn default() -> Self {
        Self {
            home_settle: Duration::from_secs(5),
            after_click: Duration::from_secs(1),
            input_reveal: Duration::from_secs(2),
            suggestion_load: Duration::from_secs(3),
            after_confirm: Duration::from_secs(5),
            login_poll_interval: Duration::from_secs(2),
            login_max_polls: 60,
            resolve_timeout: Duration::from_secs(3),
            resolve_poll: Duration::from_millis(250),
            listen_timeout: Duration::from_secs(8),
            phrase_limit: Duration::from_secs(10),
            prompt_attempts: PROMPT_ATTEMPTS,
        }
    }
}

impl FlowTimings {
    /// No waiting at all; a single pass per catalogue.
    pub fn immediate() -> Self {
        Self {
            home_settle: Duration::ZERO,
            after_click: Duration::ZERO,
            input_reveal: Duration::ZERO,
            suggestion_load: Duration::ZERO,
            after_confirm: Duration::ZERO,
            login_poll_interval: Duration::ZERO,
            login_max_polls: 3,
            resolve_timeout: Duration::ZERO,
            resolve_poll: Duration::ZERO,
            listen_timeout: Duration::ZERO,
            phrase_limit: Duration::ZERO,
            prompt_attempts: PROMPT_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub start_url: String,
    pub headless: bool,
    pub user_agent: String,
    pub window_size: (u32, u32),
    /// Persistent profile so logins survive between runs. `None` uses a
    /// throwaway profile.
    pub profile_dir: Option<PathBuf>,
    /// Debugging endpoint of an already running Chrome to attach to.
    pub attach_url: Option<String>,
    pub chrome_path: Option<PathBuf>,
}

impl BrowserConfig {
    pub fn new(production: bool) -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            headless: production,
            user_agent: MOBILE_USER_AGENT.to_string(),
            window_size: (420, 900),
            profile_dir: if production { None } else { default_profile_dir() },
            attach_url: None,
            chrome_path: None,
        }
    }
}

/// `<local data dir>/novacab/mobile-profile`.
pub fn default_profile_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("novacab").join("mobile-profile"))
}

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct BookingConfig {
    pub production: bool,
    pub browser: BrowserConfig,
    pub timings: FlowTimings,
    pub navigation: RetryPolicy,
    /// Answers fed to the canned voice channel in production.
    pub canned_answers: Vec<String>,
}

impl BookingConfig {
    pub fn new(production: bool) -> Self {
        Self {
            production,
            browser: BrowserConfig::new(production),
            timings: FlowTimings::default(),
            navigation: RetryPolicy::default(),
            canned_answers: Vec::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(is_production_env())
    }

    /// Settings for one of several concurrent runs. Chrome locks its profile
    /// directory, so each run gets `<profile>/runs/<run_id>`, and each run
    /// launches its own browser instead of sharing an attached one.
    pub fn for_run(&self, run_id: Uuid) -> Self {
        let mut config = self.clone();
        config.browser.profile_dir = self
            .browser
            .profile_dir
            .as_ref()
            .map(|dir| dir.join("runs").join(run_id.to_string()));
        config.browser.attach_url = None;
        config
    }
}
