//! The standby loop: wait for the wake phrase, then take spoken commands.

use chrono::{Local, Timelike};
use std::time::Duration;
use tracing::{debug, info};

use crate::voice::VoiceChannel;

const INTRODUCTIONS: [&str; 3] = [
    "Hello, I'm NovaCab. Your voice is my command.",
    "I'm Nova, here to help you with cabs and conversation.",
    "Nova here! Ready to make your travels smooth and easy.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Introduce,
    Sleep,
    Exit,
    BookRide,
    Unknown,
}

pub fn parse_command(text: &str) -> Command {
    let text = text.to_lowercase();
    if text.contains("introduce") || text.contains("who are you") {
        Command::Introduce
    } else if text.contains("sleep") {
        Command::Sleep
    } else if text.contains("exit") || text.contains("quit") {
        Command::Exit
    } else if text.contains("book a cab") || text.contains("open uber") {
        Command::BookRide
    } else {
        Command::Unknown
    }
}

pub fn is_wake_phrase(text: &str) -> bool {
    let text = text.to_lowercase();
    text.contains("wake up nova") || (text.contains("wake") && text.contains("nova"))
}

pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good morning",
        12..=16 => "Good afternoon",
        _ => "Good evening",
    }
}

pub struct Assistant<V> {
    voice: V,
    /// Skip the wake phrase; nobody is there to say it.
    always_awake: bool,
    listen_timeout: Duration,
    phrase_limit: Duration,
    /// Stop after this many utterances. `None` listens until told to exit.
    max_turns: Option<usize>,
}

impl<V: VoiceChannel> Assistant<V> {
    pub fn new(voice: V, always_awake: bool) -> Self {
        Self {
            voice,
            always_awake,
            listen_timeout: Duration::from_secs(8),
            phrase_limit: Duration::from_secs(10),
            max_turns: None,
        }
    }

    pub fn with_listen_limits(mut self, timeout: Duration, phrase_limit: Duration) -> Self {
        self.listen_timeout = timeout;
        self.phrase_limit = phrase_limit;
        self
    }

    pub fn with_max_turns(mut self, max_turns: Option<usize>) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn voice_mut(&mut self) -> &mut V {
        &mut self.voice
    }

    pub fn into_voice(self) -> V {
        self.voice
    }

    /// Run until "exit" or the turn limit. `book` is handed the voice channel
    /// whenever a ride is requested.
    pub fn run(&mut self, mut book: impl FnMut(&mut V)) {
        let mut turns = 0usize;
        let mut awake = self.always_awake;

        self.voice
            .speak("Nova is standing by. Say 'wake up Nova' to begin.");
        if awake {
            self.greet();
        }

        while self.max_turns.is_none_or(|max| turns < max) {
            let heard = self.listen();
            turns += 1;

            if !awake {
                if is_wake_phrase(&heard) {
                    awake = true;
                    self.greet();
                }
                continue;
            }
            if heard.trim().is_empty() {
                continue;
            }

            let command = parse_command(&heard);
            info!(?command, %heard, "command");
            match command {
                Command::Introduce => {
                    let pick = rand::random::<u32>() as usize % INTRODUCTIONS.len();
                    self.voice.speak(INTRODUCTIONS[pick]);
                }
                Command::Sleep => {
                    self.voice
                        .speak("Entering sleep mode. Say 'wake up Nova' when you're ready.");
                    awake = false;
                }
                Command::Exit => {
                    self.voice.speak("Goodbye. Nova signing off.");
                    return;
                }
                Command::BookRide => book(&mut self.voice),
                Command::Unknown => self.voice.speak("I didn't catch that."),
            }
        }
        debug!(turns, "turn limit reached");
    }

    fn listen(&mut self) -> String {
        self.voice.listen(self.listen_timeout, self.phrase_limit)
    }

    fn greet(&mut self) {
        let hour = Local::now().hour();
        self.voice.speak(greeting(hour));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::CannedVoice;

    #[test]
    fn greeting_by_hour() {
        assert_eq!(greeting(0), "Good morning");
        assert_eq!(greeting(11), "Good morning");
        assert_eq!(greeting(12), "Good afternoon");
        assert_eq!(greeting(16), "Good afternoon");
        assert_eq!(greeting(17), "Good evening");
    }

    #[test]
    fn wake_phrase_variants() {
        assert!(is_wake_phrase("Wake up Nova"));
        assert!(is_wake_phrase("nova please wake"));
        assert!(!is_wake_phrase("wake up"));
    }

    #[test]
    fn commands_are_recognised() {
        assert_eq!(parse_command("please book a cab"), Command::BookRide);
        assert_eq!(parse_command("Open Uber"), Command::BookRide);
        assert_eq!(parse_command("who are you"), Command::Introduce);
        assert_eq!(parse_command("go to sleep"), Command::Sleep);
        assert_eq!(parse_command("quit"), Command::Exit);
        assert_eq!(parse_command("sing"), Command::Unknown);
    }

    #[test]
    fn ignores_commands_until_woken() {
        let voice = CannedVoice::new(["book a cab", "wake up nova", "book a cab", "exit"]);
        let mut assistant = Assistant::new(voice, false);
        let mut bookings = 0;
        assistant.run(|_| bookings += 1);
        assert_eq!(bookings, 1);
        let spoken = assistant.into_voice().spoken().to_vec();
        assert_eq!(spoken.last().map(String::as_str), Some("Goodbye. Nova signing off."));
    }

    #[test]
    fn sleep_mode_waits_for_wake_phrase() {
        let voice = CannedVoice::new(["sleep", "book a cab", "wake nova", "book a cab"])
            .with_fallback("");
        let mut assistant = Assistant::new(voice, true).with_max_turns(Some(6));
        let mut bookings = 0;
        assistant.run(|_| bookings += 1);
        assert_eq!(bookings, 1);
    }

    #[test]
    fn turn_limit_stops_the_loop() {
        let voice = CannedVoice::new(Vec::<String>::new()).with_fallback("book a cab");
        let mut assistant = Assistant::new(voice, true).with_max_turns(Some(3));
        let mut bookings = 0;
        assistant.run(|_| bookings += 1);
        assert_eq!(bookings, 3);
    }
}
