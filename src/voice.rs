//! Voice I/O seam.
//!
//! Speech synthesis and recognition live outside this crate; the flow only
//! needs `speak` and a `listen` that gives up after a timeout. Two channels are
//! provided: a console channel for interactive use and a canned channel for
//! production, where nobody is at a microphone.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

pub trait VoiceChannel {
    fn speak(&mut self, text: &str);

    /// Capture one utterance. Returns an empty string on timeout or silence.
    fn listen(&mut self, timeout: Duration, phrase_limit: Duration) -> String;
}

impl<V: VoiceChannel + ?Sized> VoiceChannel for Box<V> {
    fn speak(&mut self, text: &str) {
        (**self).speak(text)
    }

    fn listen(&mut self, timeout: Duration, phrase_limit: Duration) -> String {
        (**self).listen(timeout, phrase_limit)
    }
}

/// Lines read from one input stream by a single background reader. Clones
/// share the reader, so channels built one after another never drop a line.
#[derive(Clone)]
pub struct ConsoleInput {
    lines: Arc<Mutex<Receiver<String>>>,
}

static STDIN: OnceLock<ConsoleInput> = OnceLock::new();

impl ConsoleInput {
    /// The process-wide stdin reader, started on first use.
    pub fn stdin() -> Self {
        STDIN
            .get_or_init(|| Self::from_reader(BufReader::new(std::io::stdin())))
            .clone()
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self {
            lines: Arc::new(Mutex::new(rx)),
        }
    }

    fn next_line(&self, timeout: Duration) -> Result<String, RecvTimeoutError> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.recv_timeout(timeout)
    }
}

/// Prints what Nova says and reads answers typed on stdin.
pub struct ConsoleVoice {
    input: ConsoleInput,
}

impl ConsoleVoice {
    pub fn new() -> Self {
        Self::with_input(ConsoleInput::stdin())
    }

    pub fn with_input(input: ConsoleInput) -> Self {
        Self { input }
    }
}

impl Default for ConsoleVoice {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceChannel for ConsoleVoice {
    fn speak(&mut self, text: &str) {
        info!(target: "novacab::voice", "Nova: {}", text);
        println!("\n🔊 Nova: {}", text);
    }

    fn listen(&mut self, timeout: Duration, _phrase_limit: Duration) -> String {
        println!("🎙️ Listening...");
        match self.input.next_line(timeout) {
            Ok(line) => {
                let heard = line.trim().to_lowercase();
                println!("🗣️ You said: {}", heard);
                heard
            }
            Err(RecvTimeoutError::Timeout) => {
                println!("⏱️ No response detected.");
                String::new()
            }
            Err(RecvTimeoutError::Disconnected) => String::new(),
        }
    }
}

/// Deterministic input for unattended runs: answers from a script, then a
/// fixed fallback phrase forever.
#[derive(Debug, Clone)]
pub struct CannedVoice {
    script: VecDeque<String>,
    fallback: String,
    spoken: Vec<String>,
}

pub const CANNED_FALLBACK: &str = "book a cab";

impl CannedVoice {
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: script.into_iter().map(Into::into).collect(),
            fallback: CANNED_FALLBACK.to_string(),
            spoken: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Everything spoken so far, oldest first.
    pub fn spoken(&self) -> &[String] {
        &self.spoken
    }
}

impl VoiceChannel for CannedVoice {
    fn speak(&mut self, text: &str) {
        info!(target: "novacab::voice", "Nova: {}", text);
        self.spoken.push(text.to_string());
    }

    fn listen(&mut self, _timeout: Duration, _phrase_limit: Duration) -> String {
        let heard = self
            .script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        debug!(%heard, "canned answer");
        heard
    }
}
