mod common;

use common::{
    Action, CountingHandoff, ScriptedVoice, StubPage, Trigger, button, hidden, input,
};
use novacab::auth::LoginOutcome;
use novacab::browser::BrowserError;
use novacab::config::FlowTimings;
use novacab::error::{FailureReason, FlowError};
use novacab::orchestrator::{BookingOrchestrator, RunOutcome};
use novacab::types::BookingStep::{self, *};
use novacab::types::Role;

fn run(page: &StubPage, voice: &mut ScriptedVoice) -> (Result<RunOutcome, FlowError>, CountingHandoff) {
    let mut handoff = CountingHandoff::default();
    let result =
        BookingOrchestrator::new(page, voice, &mut handoff, FlowTimings::immediate()).run();
    (result, handoff)
}

/// A page where every control sits where the first-choice selectors expect it.
fn booking_page() -> StubPage {
    StubPage::new()
        .on_role(Role::PickupInput, vec![input(1)])
        .on_role(Role::DestInput, vec![input(2)])
        .on_role(Role::Suggestion, vec![button(10, "Main St, Springfield")])
}

const PICKUP_QUESTION: &str = "Where should I pick you up from?";

#[test]
fn full_run_enters_both_locations() {
    let page = booking_page();
    let mut voice = ScriptedVoice::new(&["123 Main St", "456 Market St"]);

    let (result, handoff) = run(&page, &mut voice);
    let outcome = result.unwrap();

    assert_eq!(
        outcome.trace,
        vec![
            AwaitHome,
            LoginCheck,
            PickupPrompt,
            PickupEntry,
            PickupConfirm,
            DestPrompt,
            DestEntry,
            DestConfirm,
            ReadOptions,
            RequestRide,
            Done,
        ]
    );
    assert!(outcome.succeeded());
    assert_eq!(outcome.failure, None);
    assert_eq!(
        page.typed(),
        vec![(1, "123 Main St".to_string()), (2, "456 Market St".to_string())]
    );
    assert_eq!(page.clicks_on(10), 2);
    assert_eq!(outcome.pickup.as_deref(), Some("123 Main St"));
    assert_eq!(outcome.destination.as_deref(), Some("456 Market St"));
    assert_eq!(outcome.login, Some(LoginOutcome::AlreadyAuthenticated));
    assert_eq!(voice.listens, 2);
    assert_eq!(voice.times_said("Locations entered successfully."), 1);
    assert_eq!(handoff.options_read, 1);
    assert_eq!(handoff.rides_requested, 1);
}

#[test]
fn silent_rider_fails_after_three_prompts() {
    let page = booking_page();
    let mut voice = ScriptedVoice::new(&["", "   ", "\t"]);

    let (result, _) = run(&page, &mut voice);
    let outcome = result.unwrap();

    assert_eq!(outcome.trace, vec![AwaitHome, LoginCheck, PickupPrompt, Failed]);
    assert_eq!(outcome.failure, Some(FailureReason::PickupNotHeard));
    assert_eq!(voice.listens, 3);
    assert_eq!(voice.times_said(PICKUP_QUESTION), 1);
    assert_eq!(
        voice.times_said(&format!("I didn't catch that. {}", PICKUP_QUESTION)),
        2
    );
    assert_eq!(voice.times_said(FailureReason::PickupNotHeard.message()), 1);
    assert!(page.typed().is_empty());
}

#[test]
fn first_answer_is_taken_without_reprompting() {
    // No pickup field anywhere: the run stops right after the answer is heard.
    let page = StubPage::new();
    let mut voice = ScriptedVoice::new(&["221B Baker Street"]);

    let (result, _) = run(&page, &mut voice);
    let outcome = result.unwrap();

    assert_eq!(voice.listens, 1);
    assert_eq!(outcome.pickup.as_deref(), Some("221B Baker Street"));
    assert_eq!(
        outcome.trace,
        vec![AwaitHome, LoginCheck, PickupPrompt, PickupEntry, Failed]
    );
    assert_eq!(outcome.failure, Some(FailureReason::PickupInputNotFound));
    assert_eq!(
        voice.times_said(FailureReason::PickupInputNotFound.message()),
        1
    );
    assert!(!voice.spoken.iter().any(|s| s.starts_with("I didn't catch that")));
}

#[test]
fn missing_destination_answer_fails_at_its_prompt() {
    let page = booking_page();
    let mut voice = ScriptedVoice::new(&["123 Main St"]);

    let (result, handoff) = run(&page, &mut voice);
    let outcome = result.unwrap();

    assert_eq!(outcome.final_step, Failed);
    assert_eq!(outcome.trace[outcome.trace.len() - 2], DestPrompt);
    assert_eq!(outcome.failure, Some(FailureReason::DestinationNotHeard));
    assert_eq!(voice.listens, 4);
    assert_eq!(
        voice.times_said(FailureReason::DestinationNotHeard.message()),
        1
    );
    assert_eq!(page.typed().len(), 1);
    assert_eq!(handoff.options_read, 0);
}

#[test]
fn destination_never_reuses_the_pickup_input() {
    // Every destination selector lands on the pickup field; the generic
    // input scan also sees a second field.
    let page = StubPage::new()
        .on_role(Role::PickupInput, vec![input(1)])
        .on_role(Role::DestInput, vec![input(1)])
        .on_query(Role::DestInput, "input", vec![input(1), input(3)])
        .on_role(Role::Suggestion, vec![button(10, "Main St")]);
    let mut voice = ScriptedVoice::new(&["123 Main St", "456 Market St"]);

    let (result, _) = run(&page, &mut voice);

    assert!(result.unwrap().succeeded());
    assert_eq!(
        page.typed(),
        vec![(1, "123 Main St".to_string()), (3, "456 Market St".to_string())]
    );
}

#[test]
fn destination_revealed_by_clicking_hint_text() {
    let page = StubPage::new()
        .on_role(Role::PickupInput, vec![input(1)])
        .on_query(Role::DestButton, "Where to", vec![button(20, "Where to?")])
        .reveal(
            Trigger::Click(20),
            Role::DestInput,
            "input",
            vec![input(1), input(4)],
        )
        .on_role(Role::Suggestion, vec![button(10, "Main St")]);
    let mut voice = ScriptedVoice::new(&["123 Main St", "456 Market St"]);

    let (result, _) = run(&page, &mut voice);

    assert!(result.unwrap().succeeded());
    assert_eq!(page.clicks_on(20), 1);
    assert!(page.typed().contains(&(4, "456 Market St".to_string())));
    assert!(!page.actions().contains(&Action::ViewportClick));
}

#[test]
fn destination_revealed_by_clicking_the_viewport() {
    let page = StubPage::new()
        .on_role(Role::PickupInput, vec![input(1)])
        .reveal(
            Trigger::ViewportCenter,
            Role::DestInput,
            "input",
            vec![input(5)],
        )
        .on_role(Role::Suggestion, vec![button(10, "Main St")]);
    let mut voice = ScriptedVoice::new(&["123 Main St", "456 Market St"]);

    let (result, _) = run(&page, &mut voice);

    assert!(result.unwrap().succeeded());
    assert!(page.actions().contains(&Action::ViewportClick));
    assert!(page.typed().contains(&(5, "456 Market St".to_string())));
}

#[test]
fn exhausted_ladder_fails_destination_entry() {
    let page = StubPage::new()
        .on_role(Role::PickupInput, vec![input(1)])
        .on_role(Role::Suggestion, vec![button(10, "Main St")]);
    let mut voice = ScriptedVoice::new(&["123 Main St", "456 Market St"]);

    let (result, _) = run(&page, &mut voice);
    let outcome = result.unwrap();

    assert_eq!(&outcome.trace[outcome.trace.len() - 2..], &[DestEntry, Failed]);
    assert_eq!(outcome.failure, Some(FailureReason::DestinationInputNotFound));
    assert!(page.actions().contains(&Action::ViewportClick));
    assert_eq!(
        voice.times_said(FailureReason::DestinationInputNotFound.message()),
        1
    );
    assert_eq!(page.typed(), vec![(1, "123 Main St".to_string())]);
}

#[test]
fn confirm_falls_back_to_enter_and_labelled_button() {
    let page = StubPage::new()
        .on_role(Role::PickupInput, vec![input(1)])
        .on_role(Role::DestInput, vec![input(2)])
        .on_role(Role::Suggestion, vec![hidden(10)])
        .on_query(
            Role::ConfirmButton,
            "button",
            vec![button(30, "Cancel"), button(31, "Confirm pickup")],
        );
    let mut voice = ScriptedVoice::new(&["123 Main St", "456 Market St"]);

    let (result, _) = run(&page, &mut voice);

    assert!(result.unwrap().succeeded());
    let actions = page.actions();
    assert!(actions.contains(&Action::Key(1, "Enter")));
    assert!(actions.contains(&Action::Key(2, "Enter")));
    assert_eq!(page.clicks_on(10), 0);
    assert_eq!(page.clicks_on(30), 0);
    assert_eq!(page.clicks_on(31), 2);
}

#[test]
fn search_label_only_confirms_the_destination() {
    let page = StubPage::new()
        .on_role(Role::PickupInput, vec![input(1)])
        .on_role(Role::DestInput, vec![input(2)])
        .on_query(Role::ConfirmButton, "button", vec![button(32, "Search")]);
    let mut voice = ScriptedVoice::new(&["123 Main St", "456 Market St"]);

    let (result, _) = run(&page, &mut voice);

    // An unconfirmed pickup does not stop the run.
    assert!(result.unwrap().succeeded());
    assert_eq!(page.clicks_on(32), 1);
}

#[test]
fn login_wait_is_advisory() {
    let page = booking_page().on_role(Role::LoginButton, vec![button(40, "Log in")]);
    let mut voice = ScriptedVoice::new(&["123 Main St", "456 Market St"]);

    let (result, _) = run(&page, &mut voice);
    let outcome = result.unwrap();

    assert_eq!(outcome.login, Some(LoginOutcome::TimedOut { polls: 3 }));
    assert_eq!(outcome.trace[2], PickupPrompt);
    assert!(outcome.succeeded());
    assert_eq!(page.clicks_on(40), 1);
    assert_eq!(
        voice.times_said("Login not detected within time. I'll continue anyway."),
        1
    );
}

#[test]
fn login_detected_once_account_appears() {
    let page = booking_page()
        .on_role(Role::LoginButton, vec![button(40, "Log in")])
        .reveal(Trigger::Click(40), Role::LoginButton, "*", vec![])
        .reveal(
            Trigger::Click(40),
            Role::AccountButton,
            "*",
            vec![button(41, "Account")],
        );
    let mut voice = ScriptedVoice::new(&["123 Main St", "456 Market St"]);

    let (result, _) = run(&page, &mut voice);

    assert_eq!(
        result.unwrap().login,
        Some(LoginOutcome::Detected { polls: 1 })
    );
    assert_eq!(voice.times_said("Login detected. You're now logged in."), 1);
}

#[test]
fn start_booking_control_is_clicked_when_present() {
    let page = booking_page().on_role(Role::StartBooking, vec![button(50, "Where to?")]);
    let mut voice = ScriptedVoice::new(&["123 Main St", "456 Market St"]);

    let (result, _) = run(&page, &mut voice);

    assert!(result.unwrap().succeeded());
    assert_eq!(page.clicks_on(50), 1);
}

#[test]
fn broken_selector_falls_through_to_the_next() {
    let page = booking_page().broken(Role::PickupInput, "[data-testid=\"pickup-input\"]");
    let mut voice = ScriptedVoice::new(&["123 Main St", "456 Market St"]);

    let (result, _) = run(&page, &mut voice);

    assert!(result.unwrap().succeeded());
    assert_eq!(page.typed()[0], (1, "123 Main St".to_string()));
    assert!(
        page.queries()
            .iter()
            .any(|q| q.value == "[data-testid=\"pickup-input\"]")
    );
}

#[test]
fn lost_browser_aborts_without_speaking_a_failure() {
    let page = booking_page().dies_on(Role::Suggestion);
    let mut voice = ScriptedVoice::new(&["123 Main St", "456 Market St"]);
    let mut handoff = CountingHandoff::default();
    let mut seen = Vec::new();

    let result = BookingOrchestrator::new(&page, &mut voice, &mut handoff, FlowTimings::immediate())
        .with_observer(|from, to| seen.push((from, to)))
        .run();

    assert!(matches!(
        result,
        Err(FlowError::ResourceFault(BrowserError::Disconnected(_)))
    ));
    assert_eq!(seen.last(), Some(&(PickupEntry, PickupConfirm)));
    assert!(!seen.iter().any(|(_, to)| *to == Failed));
    for reason in [
        FailureReason::PickupNotHeard,
        FailureReason::DestinationNotHeard,
        FailureReason::PickupInputNotFound,
        FailureReason::DestinationInputNotFound,
    ] {
        assert_eq!(voice.times_said(reason.message()), 0);
    }
}

#[test]
fn observer_sees_every_transition() {
    let page = booking_page();
    let mut voice = ScriptedVoice::new(&["123 Main St", "456 Market St"]);
    let mut handoff = CountingHandoff::default();
    let mut seen: Vec<(BookingStep, BookingStep)> = Vec::new();

    let outcome = BookingOrchestrator::new(&page, &mut voice, &mut handoff, FlowTimings::immediate())
        .with_observer(|from, to| seen.push((from, to)))
        .run()
        .unwrap();

    assert_eq!(seen.len(), outcome.trace.len() - 1);
    for (pair, window) in seen.iter().zip(outcome.trace.windows(2)) {
        assert_eq!(*pair, (window[0], window[1]));
    }
}

#[test]
fn advance_steps_one_state_at_a_time() {
    let page = booking_page();
    let mut voice = ScriptedVoice::new(&[]);
    let mut handoff = CountingHandoff::default();
    let mut orchestrator =
        BookingOrchestrator::new(&page, &mut voice, &mut handoff, FlowTimings::immediate());

    assert_eq!(orchestrator.current(), AwaitHome);
    assert_eq!(orchestrator.advance().unwrap(), LoginCheck);
    assert_eq!(orchestrator.trace(), &[AwaitHome, LoginCheck]);

    while !orchestrator.current().is_terminal() {
        orchestrator.advance().unwrap();
    }
    assert_eq!(orchestrator.current(), Failed);

    let len = orchestrator.trace().len();
    assert_eq!(orchestrator.advance().unwrap(), Failed);
    assert_eq!(orchestrator.trace().len(), len);
}
