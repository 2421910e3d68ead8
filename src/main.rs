use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use novacab::assistant::Assistant;
use novacab::config::BookingConfig;
use novacab::launcher::{RunLauncher, run_booking, voice_for};

#[derive(Parser)]
#[command(name = "novacab", about = "Book a ride by voice")]
struct Cli {
    /// Run as on the hosted deployment: headless Chrome, canned voice input.
    #[arg(long, global = true)]
    production: bool,

    /// Page the run starts on.
    #[arg(long, global = true, env = "NOVACAB_START_URL")]
    start_url: Option<String>,

    /// Attach to a Chrome already listening on this debugging endpoint.
    #[arg(long, global = true, env = "NOVACAB_ATTACH")]
    attach: Option<String>,

    /// Chrome executable; found automatically when omitted.
    #[arg(long, global = true, env = "NOVACAB_CHROME")]
    chrome: Option<PathBuf>,

    /// Profile directory kept between runs.
    #[arg(long, global = true, env = "NOVACAB_PROFILE")]
    profile: Option<PathBuf>,

    /// Scripted answer for the canned voice channel. Repeat in order.
    #[arg(long = "answer", global = true)]
    answers: Vec<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Standby for "wake up Nova" and take spoken commands (default).
    Assistant {
        #[arg(long)]
        max_turns: Option<usize>,
    },
    /// One booking run in the foreground.
    Book,
    /// HTTP front door: POST /start launches a run, GET /events streams progress.
    Serve {
        #[arg(long, default_value = "0.0.0.0", env = "HOST")]
        host: String,
        #[arg(long, default_value_t = 5000, env = "PORT")]
        port: u16,
    },
}

impl Cli {
    fn booking_config(&self) -> BookingConfig {
        let mut config = if self.production {
            BookingConfig::new(true)
        } else {
            BookingConfig::from_env()
        };
        if let Some(url) = &self.start_url {
            config.browser.start_url = url.clone();
        }
        if self.attach.is_some() {
            config.browser.attach_url = self.attach.clone();
        }
        if self.chrome.is_some() {
            config.browser.chrome_path = self.chrome.clone();
        }
        if self.profile.is_some() {
            config.browser.profile_dir = self.profile.clone();
        }
        config.canned_answers = self.answers.clone();
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("novacab=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.booking_config();
    info!(production = config.production, url = %config.browser.start_url, "NovaCab starting");

    match cli.command.unwrap_or(Command::Assistant { max_turns: None }) {
        Command::Serve { host, port } => {
            let launcher = RunLauncher::new(config);
            novacab::face::serve(launcher, &host, port).await?;
        }
        Command::Book => {
            let outcome = RunLauncher::new(config).run_to_completion().await?;
            info!(final_step = ?outcome.final_step, trace = ?outcome.trace, "run finished");
            if !outcome.succeeded() {
                error!(failure = ?outcome.failure, "booking did not complete");
            }
        }
        Command::Assistant { max_turns } => {
            tokio::task::spawn_blocking(move || {
                let voice = voice_for(&config);
                let mut assistant = Assistant::new(voice, config.production)
                    .with_listen_limits(config.timings.listen_timeout, config.timings.phrase_limit)
                    .with_max_turns(max_turns);
                assistant.run(|voice| {
                    if let Err(e) = run_booking(&config, &mut **voice, |_, _| {}) {
                        error!(error = %format!("{:#}", e), "booking run failed");
                    }
                });
            })
            .await
            .map_err(|e| anyhow::anyhow!("assistant panicked: {}", e))?;
        }
    }

    Ok(())
}
