//! Login detection. Advisory only: the booking flow continues whatever the
//! outcome.

use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::browser::{BrowserError, BrowserHandle, ElementHandle};
use crate::catalogue::catalogue;
use crate::resolver::ElementResolver;
use crate::types::{Role, SessionState};
use crate::voice::VoiceChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVerdict {
    /// A login control is showing.
    LoggedOut,
    /// An account control is showing.
    LoggedIn,
    /// Neither was found.
    Uncertain,
}

impl AuthVerdict {
    /// Uncertain counts as logged in so a failed heuristic never blocks the
    /// flow.
    pub fn is_authenticated(self) -> bool {
        !matches!(self, AuthVerdict::LoggedOut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    AlreadyAuthenticated,
    Detected { polls: u32 },
    TimedOut { polls: u32 },
}

pub struct SessionAuthDetector {
    resolver: ElementResolver,
    probe_timeout: Duration,
}

impl SessionAuthDetector {
    pub fn new(resolver: ElementResolver, probe_timeout: Duration) -> Self {
        Self {
            resolver,
            probe_timeout,
        }
    }

    pub fn verdict<B: BrowserHandle>(&self, browser: &B) -> Result<AuthVerdict, BrowserError> {
        let login = self.resolver.resolve(
            browser,
            Role::LoginButton,
            catalogue(Role::LoginButton),
            self.probe_timeout,
        )?;
        if login.is_some() {
            return Ok(AuthVerdict::LoggedOut);
        }

        let account = self.resolver.resolve(
            browser,
            Role::AccountButton,
            catalogue(Role::AccountButton),
            self.probe_timeout,
        )?;
        if account.is_some() {
            return Ok(AuthVerdict::LoggedIn);
        }

        warn!("login state undetermined, assuming logged in");
        Ok(AuthVerdict::Uncertain)
    }

    pub fn is_authenticated<B: BrowserHandle>(
        &self,
        browser: &B,
    ) -> Result<SessionState, BrowserError> {
        let verdict = self.verdict(browser)?;
        Ok(SessionState {
            authenticated: verdict.is_authenticated(),
            last_checked_at: Utc::now(),
        })
    }

    /// Ask the human to log in and poll until they have, or until
    /// `max_polls` checks have failed. A timeout is not an error.
    pub fn await_login<B: BrowserHandle, V: VoiceChannel + ?Sized>(
        &self,
        browser: &B,
        voice: &mut V,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Result<LoginOutcome, BrowserError> {
        if self.is_authenticated(browser)?.authenticated {
            voice.speak("You're already logged in. Skipping login.");
            return Ok(LoginOutcome::AlreadyAuthenticated);
        }

        voice.speak("It looks like you're not logged in yet. Attempting to log in.");
        let button = self.resolver.resolve(
            browser,
            Role::LoginButton,
            catalogue(Role::LoginButton),
            self.probe_timeout,
        )?;
        match button {
            Some(candidate) => match candidate.handle.click() {
                Ok(()) => {
                    info!(strategy = %candidate.strategy, "login button clicked");
                    voice.speak("Please complete the login process manually.");
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "login button click failed");
                    voice.speak("Couldn't click the login button. Please try manually.");
                }
            },
            None => {
                voice.speak("I couldn't find the login button. Please try to log in manually.")
            }
        }

        for poll in 1..=max_polls {
            if self.is_authenticated(browser)?.authenticated {
                info!(poll, "login detected");
                voice.speak("Login detected. You're now logged in.");
                return Ok(LoginOutcome::Detected { polls: poll });
            }
            thread::sleep(poll_interval);
        }

        warn!(max_polls, "login not detected, continuing anyway");
        voice.speak("Login not detected within time. I'll continue anyway.");
        Ok(LoginOutcome::TimedOut { polls: max_polls })
    }
}
