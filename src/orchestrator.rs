//! The booking state machine.
//!
//! One run walks AWAIT_HOME through DONE (or FAILED), one step at a time on
//! the caller's thread. A step only moves the machine forward after observing
//! its postcondition, after exhausting its budget, or after the advisory login
//! wait. DOM misses are handled inside the step; only fatal driver errors
//! escape as `FlowError`.

use std::thread;

use tracing::{debug, info, warn};

use crate::auth::{LoginOutcome, SessionAuthDetector};
use crate::browser::{BrowserError, BrowserHandle, ElementHandle};
use crate::catalogue::{
    DEST_CONFIRM_LABELS, DESTINATION_REVEAL, PICKUP_CONFIRM_LABELS, any_input, catalogue,
};
use crate::config::FlowTimings;
use crate::error::{FailureReason, FlowError};
use crate::resolver::{ElementCandidate, ElementResolver};
use crate::types::{BookingStep, Key, NodeKey, Role, SelectorStrategy, Utterance};
use crate::voice::VoiceChannel;

/// The steps after location entry. Reading ride options aloud and pressing
/// "request" are handled elsewhere.
pub trait RideHandoff<B: BrowserHandle> {
    fn read_options(&mut self, browser: &B) -> Result<(), BrowserError>;
    fn request_ride(&mut self, browser: &B) -> Result<(), BrowserError>;
}

/// Leaves the ride options on screen for the rider to finish by hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualHandoff;

impl<B: BrowserHandle> RideHandoff<B> for ManualHandoff {
    fn read_options(&mut self, _browser: &B) -> Result<(), BrowserError> {
        info!("ride options are on screen");
        Ok(())
    }

    fn request_ride(&mut self, _browser: &B) -> Result<(), BrowserError> {
        info!("leaving the ride request to the rider");
        Ok(())
    }
}

/// Fallbacks for finding the destination field once its catalogue has
/// failed, tried once each in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationEscalation {
    /// Any visible input other than the pickup input.
    AnyOtherInput,
    /// Click text like "Where to" to reveal the field, then rescan.
    RevealByText,
    /// Click the middle of the viewport, then rescan.
    ViewportCenter,
}

pub const DESTINATION_LADDER: [DestinationEscalation; 3] = [
    DestinationEscalation::AnyOtherInput,
    DestinationEscalation::RevealByText,
    DestinationEscalation::ViewportCenter,
];

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub final_step: BookingStep,
    pub trace: Vec<BookingStep>,
    pub failure: Option<FailureReason>,
    pub login: Option<LoginOutcome>,
    pub pickup: Option<String>,
    pub destination: Option<String>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.final_step == BookingStep::Done
    }
}

type Observer<'a> = Box<dyn FnMut(BookingStep, BookingStep) + 'a>;

pub struct BookingOrchestrator<'a, B, V: ?Sized, H> {
    browser: &'a B,
    voice: &'a mut V,
    handoff: &'a mut H,
    timings: FlowTimings,
    resolver: ElementResolver,
    auth: SessionAuthDetector,
    step: BookingStep,
    trace: Vec<BookingStep>,
    pickup: Option<String>,
    destination: Option<String>,
    pickup_input: Option<NodeKey>,
    dest_input: Option<NodeKey>,
    failure: Option<FailureReason>,
    login: Option<LoginOutcome>,
    observer: Option<Observer<'a>>,
}

impl<'a, B, V, H> BookingOrchestrator<'a, B, V, H>
where
    B: BrowserHandle,
    V: VoiceChannel + ?Sized,
    H: RideHandoff<B>,
{
    pub fn new(browser: &'a B, voice: &'a mut V, handoff: &'a mut H, timings: FlowTimings) -> Self {
        let resolver = ElementResolver::new(timings.resolve_poll);
        Self {
            browser,
            voice,
            handoff,
            timings,
            resolver,
            auth: SessionAuthDetector::new(resolver, timings.resolve_timeout),
            step: BookingStep::AwaitHome,
            trace: vec![BookingStep::AwaitHome],
            pickup: None,
            destination: None,
            pickup_input: None,
            dest_input: None,
            failure: None,
            login: None,
            observer: None,
        }
    }

    /// Called with `(from, to)` on every transition.
    pub fn with_observer(mut self, observer: impl FnMut(BookingStep, BookingStep) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn current(&self) -> BookingStep {
        self.step
    }

    pub fn trace(&self) -> &[BookingStep] {
        &self.trace
    }

    /// Drive the machine to DONE or FAILED.
    pub fn run(mut self) -> Result<RunOutcome, FlowError> {
        while !self.step.is_terminal() {
            self.advance()?;
        }
        Ok(RunOutcome {
            final_step: self.step,
            trace: self.trace,
            failure: self.failure,
            login: self.login,
            pickup: self.pickup,
            destination: self.destination,
        })
    }

    /// Execute the current step and move to the next one.
    pub fn advance(&mut self) -> Result<BookingStep, FlowError> {
        let next = match self.step {
            BookingStep::AwaitHome => self.await_home()?,
            BookingStep::LoginCheck => self.login_check()?,
            BookingStep::PickupPrompt => self.pickup_prompt(),
            BookingStep::PickupEntry => self.pickup_entry()?,
            BookingStep::PickupConfirm => self.pickup_confirm()?,
            BookingStep::DestPrompt => self.dest_prompt(),
            BookingStep::DestEntry => self.dest_entry()?,
            BookingStep::DestConfirm => self.dest_confirm()?,
            BookingStep::ReadOptions => self.read_options()?,
            BookingStep::RequestRide => self.request_ride()?,
            terminal @ (BookingStep::Done | BookingStep::Failed) => return Ok(terminal),
        };
        self.transition(next);
        Ok(next)
    }

    fn transition(&mut self, next: BookingStep) {
        let from = self.step;
        info!(?from, to = ?next, "booking step");
        if next == BookingStep::Failed {
            if let Some(reason) = self.failure {
                warn!(?reason, kind = ?reason.kind(), "booking failed");
                self.voice.speak(reason.message());
            }
        }
        self.step = next;
        self.trace.push(next);
        if let Some(observer) = self.observer.as_mut() {
            observer(from, next);
        }
    }

    fn fail(&mut self, reason: FailureReason) -> BookingStep {
        self.failure = Some(reason);
        BookingStep::Failed
    }

    fn pause(&self, what: &str, wait: std::time::Duration) {
        if !wait.is_zero() {
            debug!(what, ?wait, "waiting");
            thread::sleep(wait);
        }
    }

    fn find(&self, role: Role) -> Result<Option<ElementCandidate<B::Element<'a>>>, FlowError> {
        let browser: &'a B = self.browser;
        Ok(self
            .resolver
            .resolve(browser, role, catalogue(role), self.timings.resolve_timeout)?)
    }

    /// Resolve from `strategies`, never returning the pickup input.
    fn find_not_pickup(
        &self,
        role: Role,
        strategies: &[SelectorStrategy],
    ) -> Result<Option<ElementCandidate<B::Element<'a>>>, FlowError> {
        let browser: &'a B = self.browser;
        let pickup = self.pickup_input;
        Ok(self.resolver.resolve_where(
            browser,
            role,
            strategies,
            self.timings.resolve_timeout,
            |el| Some(el.node_key()) != pickup,
        )?)
    }

    /// Click an optional control. Returns whether the click landed.
    fn click_optional(&self, role: Role) -> Result<bool, FlowError> {
        let Some(candidate) = self.find(role)? else {
            debug!(%role, "optional control absent");
            return Ok(false);
        };
        let clicked = tolerate(candidate.handle.click(), "click")?.is_some();
        if clicked {
            info!(%role, strategy = %candidate.strategy, "clicked");
        }
        Ok(clicked)
    }

    fn await_home(&mut self) -> Result<BookingStep, FlowError> {
        self.pause("page settle", self.timings.home_settle);
        if self.click_optional(Role::StartBooking)? {
            self.pause("booking view", self.timings.input_reveal);
        }
        Ok(BookingStep::LoginCheck)
    }

    fn login_check(&mut self) -> Result<BookingStep, FlowError> {
        let outcome = self.auth.await_login(
            self.browser,
            &mut *self.voice,
            self.timings.login_poll_interval,
            self.timings.login_max_polls,
        )?;
        self.login = Some(outcome);
        Ok(BookingStep::PickupPrompt)
    }

    /// Ask up to `prompt_attempts` times; the first non-blank answer wins.
    fn ask(&mut self, step: BookingStep, question: &str) -> Option<String> {
        for attempt in 0..self.timings.prompt_attempts {
            if attempt == 0 {
                self.voice.speak(question);
            } else {
                self.voice.speak(&format!("I didn't catch that. {}", question));
            }
            let utterance = Utterance {
                step,
                text: self
                    .voice
                    .listen(self.timings.listen_timeout, self.timings.phrase_limit),
            };
            if let Some(answer) = utterance.accepted() {
                info!(?step, attempt, answer, "heard");
                return Some(answer.to_string());
            }
            debug!(?step, attempt, "empty answer");
        }
        None
    }

    fn pickup_prompt(&mut self) -> BookingStep {
        match self.ask(BookingStep::PickupPrompt, "Where should I pick you up from?") {
            Some(pickup) => {
                self.pickup = Some(pickup);
                BookingStep::PickupEntry
            }
            None => self.fail(FailureReason::PickupNotHeard),
        }
    }

    fn dest_prompt(&mut self) -> BookingStep {
        match self.ask(BookingStep::DestPrompt, "Where are you going?") {
            Some(destination) => {
                self.destination = Some(destination);
                BookingStep::DestEntry
            }
            None => self.fail(FailureReason::DestinationNotHeard),
        }
    }

    /// Clear then type. A field that refuses to clear is typed into anyway.
    fn enter_text(&self, input: &B::Element<'a>, text: &str) -> Result<bool, FlowError> {
        if tolerate(input.clear(), "clear")?.is_none() {
            debug!("input could not be cleared");
        }
        Ok(tolerate(input.type_text(text), "type")?.is_some())
    }

    fn pickup_entry(&mut self) -> Result<BookingStep, FlowError> {
        if self.click_optional(Role::PickupButton)? {
            self.pause("pickup input", self.timings.input_reveal);
        }

        let Some(input) = self.find(Role::PickupInput)? else {
            return Ok(self.fail(FailureReason::PickupInputNotFound));
        };
        let pickup = self.pickup.clone().unwrap_or_default();
        if !self.enter_text(&input.handle, &pickup)? {
            return Ok(self.fail(FailureReason::PickupInputNotFound));
        }

        info!(strategy = %input.strategy, pickup = %pickup, "pickup entered");
        self.pickup_input = Some(input.node_key());
        self.pause("suggestions", self.timings.suggestion_load);
        Ok(BookingStep::PickupConfirm)
    }

    fn dest_entry(&mut self) -> Result<BookingStep, FlowError> {
        if self.click_optional(Role::DestButton)? {
            self.pause("destination input", self.timings.input_reveal);
        }

        let mut input = self.find_not_pickup(Role::DestInput, catalogue(Role::DestInput))?;
        if input.is_none() {
            for rung in DESTINATION_LADDER {
                info!(?rung, "escalating destination search");
                input = self.escalate(rung)?;
                if input.is_some() {
                    break;
                }
            }
        }

        let Some(input) = input else {
            return Ok(self.fail(FailureReason::DestinationInputNotFound));
        };
        let destination = self.destination.clone().unwrap_or_default();
        if !self.enter_text(&input.handle, &destination)? {
            return Ok(self.fail(FailureReason::DestinationInputNotFound));
        }

        info!(strategy = %input.strategy, destination = %destination, "destination entered");
        self.dest_input = Some(input.node_key());
        self.pause("suggestions", self.timings.suggestion_load);
        Ok(BookingStep::DestConfirm)
    }

    fn escalate(
        &self,
        rung: DestinationEscalation,
    ) -> Result<Option<ElementCandidate<B::Element<'a>>>, FlowError> {
        let rescan = [any_input(Role::DestInput)];
        match rung {
            DestinationEscalation::AnyOtherInput => {}
            DestinationEscalation::RevealByText => {
                let browser: &'a B = self.browser;
                let Some(hint) = self.resolver.resolve(
                    browser,
                    Role::DestButton,
                    DESTINATION_REVEAL,
                    self.timings.resolve_timeout,
                )?
                else {
                    return Ok(None);
                };
                if tolerate(hint.handle.click(), "click")?.is_none() {
                    return Ok(None);
                }
                self.pause("destination input", self.timings.input_reveal);
            }
            DestinationEscalation::ViewportCenter => {
                tolerate(self.browser.click_viewport_center(), "viewport click")?;
                self.pause("destination input", self.timings.after_click);
            }
        }
        self.find_not_pickup(Role::DestInput, &rescan)
    }

    fn pickup_confirm(&mut self) -> Result<BookingStep, FlowError> {
        self.confirm(self.pickup_input, Role::PickupInput, PICKUP_CONFIRM_LABELS)?;
        self.pause("destination view", self.timings.after_confirm);
        Ok(BookingStep::DestPrompt)
    }

    fn dest_confirm(&mut self) -> Result<BookingStep, FlowError> {
        self.confirm(self.dest_input, Role::DestInput, DEST_CONFIRM_LABELS)?;
        self.pause("ride options", self.timings.after_confirm);
        self.voice.speak("Locations entered successfully.");
        Ok(BookingStep::ReadOptions)
    }

    /// Best effort: pick the first suggestion, or press Enter in the input and
    /// click a button labelled with one of `labels`. Whether the site accepted
    /// the location is not verified.
    fn confirm(
        &self,
        input: Option<NodeKey>,
        input_role: Role,
        labels: &[&str],
    ) -> Result<(), FlowError> {
        if let Some(suggestion) = self.find(Role::Suggestion)? {
            if tolerate(suggestion.handle.click(), "click")?.is_some() {
                info!(strategy = %suggestion.strategy, "suggestion selected");
                return Ok(());
            }
        }
        warn!(%input_role, "no suggestion selected, trying fallbacks");

        if let Some(el) = self.relocate(input, input_role)? {
            if tolerate(el.send_key(Key::Enter), "enter")?.is_some() {
                debug!("pressed enter in input");
            }
        }

        let browser: &'a B = self.browser;
        let button = self.resolver.resolve_where(
            browser,
            Role::ConfirmButton,
            catalogue(Role::ConfirmButton),
            self.timings.resolve_timeout,
            |el| label_matches(&el.text(), labels),
        )?;
        if let Some(button) = button {
            if tolerate(button.handle.click(), "click")?.is_some() {
                let label = button.handle.text();
                info!(label = %label.trim(), "clicked fallback button");
            }
        }
        Ok(())
    }

    /// Find the input entered into earlier, by identity. The DOM may have been
    /// rebuilt since, in which case there is nothing to find.
    fn relocate(
        &self,
        key: Option<NodeKey>,
        role: Role,
    ) -> Result<Option<B::Element<'a>>, FlowError> {
        let Some(key) = key else { return Ok(None) };
        let browser: &'a B = self.browser;
        let inputs = tolerate(browser.find_all(&any_input(role)), "query")?.unwrap_or_default();
        Ok(inputs.into_iter().find(|el| el.node_key() == key))
    }

    fn read_options(&mut self) -> Result<BookingStep, FlowError> {
        tolerate(self.handoff.read_options(self.browser), "read options")?;
        Ok(BookingStep::RequestRide)
    }

    fn request_ride(&mut self) -> Result<BookingStep, FlowError> {
        tolerate(self.handoff.request_ride(self.browser), "request ride")?;
        Ok(BookingStep::Done)
    }
}

/// Case-insensitive substring match against any of `labels`.
pub fn label_matches(text: &str, labels: &[&str]) -> bool {
    let text = text.to_lowercase();
    labels.iter().any(|l| text.contains(l))
}

/// Non-fatal driver errors become `None`; fatal ones abort the run.
fn tolerate<T>(result: Result<T, BrowserError>, what: &str) -> Result<Option<T>, FlowError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_fatal() => Err(FlowError::ResourceFault(e)),
        Err(e) => {
            warn!(what, error = %e, "ignored");
            Ok(None)
        }
    }
}
