//! Starting runs.
//!
//! A run owns its own Chrome session and executes on a blocking worker. The
//! caller only learns that the run was launched; progress and outcome are
//! published as [`RunEvent`]s.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::browser::BrowserHandle;
use crate::config::BookingConfig;
use crate::error::FailureReason;
use crate::hands::ChromeBrowser;
use crate::orchestrator::{BookingOrchestrator, ManualHandoff, RunOutcome};
use crate::types::BookingStep;
use crate::voice::{CannedVoice, ConsoleVoice, VoiceChannel};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Launched {
        run_id: Uuid,
    },
    Step {
        run_id: Uuid,
        from: BookingStep,
        to: BookingStep,
    },
    Finished {
        run_id: Uuid,
        final_step: BookingStep,
        failure: Option<FailureReason>,
    },
    /// The run died on a resource fault (browser gone, page never loaded).
    Faulted {
        run_id: Uuid,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunHandle {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl RunHandle {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }
}

/// The voice channel a run should use: canned answers in production, the
/// console otherwise.
pub fn voice_for(config: &BookingConfig) -> Box<dyn VoiceChannel + Send> {
    if config.production {
        Box::new(CannedVoice::new(config.canned_answers.clone()))
    } else {
        Box::new(ConsoleVoice::new())
    }
}

/// One full run on the calling thread: open Chrome, load the start page with
/// retries, then walk the booking flow.
pub fn run_booking<V: VoiceChannel + ?Sized>(
    config: &BookingConfig,
    voice: &mut V,
    observe: impl FnMut(BookingStep, BookingStep),
) -> Result<RunOutcome> {
    voice.speak("Opening Uber mobile website. Please wait...");

    let opened = ChromeBrowser::launch(&config.browser).and_then(|browser| {
        config
            .navigation
            .with_retries("open start page", |timeout| {
                browser.tab().set_default_timeout(timeout);
                browser.navigate(&config.browser.start_url)
            })
            .context("loading start page")?;
        Ok(browser)
    });
    let browser = match opened {
        Ok(b) => b,
        Err(e) => {
            error!(error = %format!("{:#}", e), "could not open the booking site");
            voice.speak("Failed to open Uber mobile website.");
            return Err(e);
        }
    };

    let mut handoff = ManualHandoff;
    let outcome = BookingOrchestrator::new(&browser, voice, &mut handoff, config.timings)
        .with_observer(observe)
        .run();
    outcome.map_err(|e| {
        let e = anyhow::Error::new(e);
        error!(error = %format!("{:#}", e), "run aborted");
        e
    })
}

/// Launches independent runs. Cheap to clone.
#[derive(Clone)]
pub struct RunLauncher {
    config: Arc<BookingConfig>,
    events: broadcast::Sender<RunEvent>,
}

impl RunLauncher {
    pub fn new(config: BookingConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            config: Arc::new(config),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    /// Fire and forget. Must be called from inside a Tokio runtime; every call
    /// starts a separate run with its own browser.
    pub fn start_run(&self) -> RunHandle {
        let handle = RunHandle::new();
        let run_id = handle.id;
        let events = self.events.clone();
        let _ = events.send(RunEvent::Launched { run_id });
        info!(%run_id, "run launched");

        let config = self.config.for_run(run_id);
        let span = info_span!("run", %run_id);
        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let mut voice = voice_for(&config);
            let steps = events.clone();
            let result = run_booking(&config, &mut *voice, |from, to| {
                let _ = steps.send(RunEvent::Step { run_id, from, to });
            });
            let event = match result {
                Ok(outcome) => {
                    info!(final_step = ?outcome.final_step, "run finished");
                    RunEvent::Finished {
                        run_id,
                        final_step: outcome.final_step,
                        failure: outcome.failure,
                    }
                }
                Err(e) => RunEvent::Faulted {
                    run_id,
                    message: format!("{:#}", e),
                },
            };
            let _ = events.send(event);
            if let Some(dir) = &config.browser.profile_dir {
                if let Err(e) = std::fs::remove_dir_all(dir) {
                    warn!(profile = %dir.display(), error = %e, "could not remove run profile");
                }
            }
        });

        handle
    }

    /// Run once on the current task and wait for the outcome.
    pub async fn run_to_completion(&self) -> Result<RunOutcome> {
        let config = Arc::clone(&self.config);
        let span = info_span!("run", run_id = %Uuid::new_v4());
        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let mut voice = voice_for(&config);
            run_booking(&config, &mut *voice, |_, _| {})
        })
        .await
        .context("run worker panicked")?
    }
}
