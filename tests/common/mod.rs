#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use novacab::browser::{BrowserError, BrowserHandle, ElementHandle};
use novacab::orchestrator::RideHandoff;
use novacab::types::{Key, NodeKey, Role, SelectorStrategy};
use novacab::voice::VoiceChannel;

/// Everything the flow did to the page, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Click(u64),
    Clear(u64),
    Type(u64, String),
    Key(u64, &'static str),
    Scroll(u64),
    ViewportClick,
}

type Log = Arc<Mutex<Vec<Action>>>;

#[derive(Debug, Clone)]
pub struct Spec {
    pub key: u64,
    pub visible: bool,
    pub enabled: bool,
    pub text: String,
}

pub fn input(key: u64) -> Spec {
    Spec {
        key,
        visible: true,
        enabled: true,
        text: String::new(),
    }
}

pub fn button(key: u64, text: &str) -> Spec {
    Spec {
        key,
        visible: true,
        enabled: true,
        text: text.to_string(),
    }
}

pub fn hidden(key: u64) -> Spec {
    Spec {
        key,
        visible: false,
        enabled: true,
        text: String::new(),
    }
}

#[derive(Debug, Clone)]
pub struct StubElement {
    spec: Spec,
    log: Log,
}

impl StubElement {
    fn record(&self, action: Action) -> Result<(), BrowserError> {
        self.log.lock().unwrap().push(action);
        Ok(())
    }
}

impl ElementHandle for StubElement {
    fn node_key(&self) -> NodeKey {
        NodeKey(self.spec.key)
    }

    fn is_visible(&self) -> bool {
        self.spec.visible
    }

    fn is_enabled(&self) -> bool {
        self.spec.enabled
    }

    fn text(&self) -> String {
        self.spec.text.clone()
    }

    fn click(&self) -> Result<(), BrowserError> {
        self.record(Action::Click(self.spec.key))
    }

    fn clear(&self) -> Result<(), BrowserError> {
        self.record(Action::Clear(self.spec.key))
    }

    fn type_text(&self, text: &str) -> Result<(), BrowserError> {
        self.record(Action::Type(self.spec.key, text.to_string()))
    }

    fn scroll_into_view(&self) -> Result<(), BrowserError> {
        self.record(Action::Scroll(self.spec.key))
    }

    fn send_key(&self, key: Key) -> Result<(), BrowserError> {
        self.record(Action::Key(self.spec.key, key.name()))
    }
}

/// What makes hidden markup appear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    Click(u64),
    ViewportCenter,
}

/// An in-memory page. Queries are answered by exact `(role, selector)` first,
/// then by role for every strategy of that role.
#[derive(Default)]
pub struct StubPage {
    by_query: HashMap<(Role, &'static str), Vec<Spec>>,
    by_role: HashMap<Role, Vec<Spec>>,
    reveals: Vec<(Trigger, Role, &'static str, Vec<Spec>)>,
    broken: Vec<(Role, &'static str)>,
    dead_roles: Vec<Role>,
    log: Log,
    queries: Mutex<Vec<SelectorStrategy>>,
}

impl StubPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_role(mut self, role: Role, elements: Vec<Spec>) -> Self {
        self.by_role.insert(role, elements);
        self
    }

    pub fn on_query(mut self, role: Role, selector: &'static str, elements: Vec<Spec>) -> Self {
        self.by_query.insert((role, selector), elements);
        self
    }

    /// After `trigger`, the query answers `elements` instead. A selector of
    /// `"*"` covers every query for the role.
    pub fn reveal(
        mut self,
        trigger: Trigger,
        role: Role,
        selector: &'static str,
        elements: Vec<Spec>,
    ) -> Self {
        self.reveals.push((trigger, role, selector, elements));
        self
    }

    /// The query fails with a recoverable error.
    pub fn broken(mut self, role: Role, selector: &'static str) -> Self {
        self.broken.push((role, selector));
        self
    }

    /// Any query for `role` reports the browser as gone.
    pub fn dies_on(mut self, role: Role) -> Self {
        self.dead_roles.push(role);
        self
    }

    pub fn actions(&self) -> Vec<Action> {
        self.log.lock().unwrap().clone()
    }

    pub fn typed(&self) -> Vec<(u64, String)> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Type(k, t) => Some((k, t)),
                _ => None,
            })
            .collect()
    }

    pub fn clicks_on(&self, key: u64) -> usize {
        self.actions()
            .iter()
            .filter(|a| **a == Action::Click(key))
            .count()
    }

    pub fn queries(&self) -> Vec<SelectorStrategy> {
        self.queries.lock().unwrap().clone()
    }

    fn triggered(&self, trigger: Trigger) -> bool {
        let log = self.log.lock().unwrap();
        match trigger {
            Trigger::Click(key) => log.contains(&Action::Click(key)),
            Trigger::ViewportCenter => log.contains(&Action::ViewportClick),
        }
    }

    fn answer(&self, strategy: &SelectorStrategy) -> Vec<Spec> {
        let revealed = self.reveals.iter().rev().find(|(trigger, role, selector, _)| {
            *role == strategy.role
                && (*selector == "*" || *selector == strategy.value)
                && self.triggered(*trigger)
        });
        if let Some((_, _, _, elements)) = revealed {
            return elements.clone();
        }
        if let Some(elements) = self.by_query.get(&(strategy.role, strategy.value)) {
            return elements.clone();
        }
        self.by_role.get(&strategy.role).cloned().unwrap_or_default()
    }
}

impl BrowserHandle for StubPage {
    type Element<'a> = StubElement;

    fn navigate(&self, _url: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    fn find_all(&self, strategy: &SelectorStrategy) -> Result<Vec<StubElement>, BrowserError> {
        self.queries.lock().unwrap().push(*strategy);
        if self.dead_roles.contains(&strategy.role) {
            return Err(BrowserError::Disconnected("target closed".into()));
        }
        if self.broken.contains(&(strategy.role, strategy.value)) {
            return Err(BrowserError::Query {
                selector: strategy.to_string(),
                message: "invalid selector".into(),
            });
        }
        Ok(self
            .answer(strategy)
            .into_iter()
            .map(|spec| StubElement {
                spec,
                log: Arc::clone(&self.log),
            })
            .collect())
    }

    fn click_viewport_center(&self) -> Result<(), BrowserError> {
        self.log.lock().unwrap().push(Action::ViewportClick);
        Ok(())
    }
}

/// Replays answers, then stays silent. Counts its own calls.
#[derive(Debug, Default)]
pub struct ScriptedVoice {
    answers: VecDeque<String>,
    pub spoken: Vec<String>,
    pub listens: usize,
}

impl ScriptedVoice {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn times_said(&self, text: &str) -> usize {
        self.spoken.iter().filter(|s| s.as_str() == text).count()
    }
}

impl VoiceChannel for ScriptedVoice {
    fn speak(&mut self, text: &str) {
        self.spoken.push(text.to_string());
    }

    fn listen(&mut self, _timeout: Duration, _phrase_limit: Duration) -> String {
        self.listens += 1;
        self.answers.pop_front().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct CountingHandoff {
    pub options_read: usize,
    pub rides_requested: usize,
}

impl<B: BrowserHandle> RideHandoff<B> for CountingHandoff {
    fn read_options(&mut self, _browser: &B) -> Result<(), BrowserError> {
        self.options_read += 1;
        Ok(())
    }

    fn request_ride(&mut self, _browser: &B) -> Result<(), BrowserError> {
        self.rides_requested += 1;
        Ok(())
    }
}
