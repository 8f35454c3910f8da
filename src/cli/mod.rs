//! # CLI Module
//!
//! Command-line interface for the photobooth.
//!
//! ## Usage
//! ```bash
//! # Run the booth with the default configuration
//! photobooth run
//!
//! # Two quick unattended sessions, then exit
//! photobooth run --sessions 2 --delay-ms 100 --omit-welcome
//!
//! # Print the transition table
//! photobooth transitions --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use photobooth::config::{BoothConfig, TimingConfig};
use photobooth::core::display::DisplayDriver;
use photobooth::core::machine::{Session, State, Transition};
use photobooth::core::picture::{Picture, PictureRef};
use photobooth::error::Result;
use photobooth::events::{names, Event, TeardownTarget};
use serde::Serialize;
use std::path::PathBuf;

/// Photobooth - session controller for a photo booth kiosk
#[derive(Parser, Debug)]
#[command(name = "photobooth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the booth until it is torn down
    Run {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Shots per picture
        #[arg(short, long)]
        shots: Option<u32>,

        /// Stop after this many pictures
        #[arg(long)]
        sessions: Option<u32>,

        /// Skip the welcome screen
        #[arg(long)]
        omit_welcome: bool,

        /// Disable the camera preview stream
        #[arg(long)]
        no_preview: bool,

        /// Use one delay for every screen
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Directory for pictures
        #[arg(long)]
        basedir: Option<PathBuf>,

        /// Ask for a restart instead of exiting when all sessions are done
        #[arg(long)]
        restart: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the transition table of the state machine
    Transitions {
        /// Shots per picture assumed for the table
        #[arg(short, long, default_value = "2")]
        shots: u32,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Include pairs without a transition
        #[arg(long)]
        all: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI and return the process exit code
pub fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            shots,
            sessions,
            omit_welcome,
            no_preview,
            delay_ms,
            basedir,
            restart,
            verbose,
        } => {
            photobooth::init_tracing(if verbose { "debug" } else { "info" });

            let mut booth_config = match config {
                Some(path) => BoothConfig::load(path)?,
                None => BoothConfig::default(),
            };
            if let Some(shots) = shots {
                booth_config = booth_config.with_num_shots(shots);
            }
            if let Some(ms) = delay_ms {
                booth_config = booth_config.with_timing(TimingConfig::uniform(ms));
            }
            if let Some(basedir) = basedir {
                booth_config = booth_config.with_basedir(basedir);
            }
            if omit_welcome {
                booth_config = booth_config.with_omit_welcome(true);
            }
            booth_config.camera.show_preview &= !no_preview;

            let mut display = DisplayDriver::new(booth_config.timing.clone());
            if let Some(sessions) = sessions {
                display = display.sessions(sessions);
            }
            if restart {
                display = display.finish_with(TeardownTarget::Restart);
            }

            run_booth(booth_config, display)
        }
        Commands::Transitions { shots, output, all } => {
            print_transitions(shots, output, all)?;
            Ok(0)
        }
    }
}

fn run_booth(config: BoothConfig, display: DisplayDriver) -> Result<i32> {
    let term = Term::stderr();

    term.write_line(&format!(
        "{} {}",
        style("Photobooth").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line(&format!(
        "  {} {}",
        style("Pictures:").dim(),
        config.storage.full_basename()
    ))
    .ok();
    term.write_line("").ok();

    let booth = photobooth::Photobooth::builder()
        .config(config)
        .display(display)
        .build()?;
    let pictures = booth.picture_counter();
    let code = booth.run()?;

    let outcome = if code == 0 {
        style("✓ Stopped").green().bold()
    } else {
        style("↻ Restart requested").yellow().bold()
    };
    term.write_line(&format!(
        "{} after {} picture(s) {}",
        outcome,
        style(pictures.value()).cyan(),
        style(format!("(exit code {})", code)).dim()
    ))
    .ok();

    Ok(code)
}

#[derive(Debug, Serialize)]
struct Row {
    state: String,
    event: String,
    result: Option<String>,
}

fn sample_states(shots: u32) -> Result<Vec<State>> {
    Ok(vec![
        State::Welcome,
        State::Startup,
        State::Idle,
        State::Slideshow,
        State::Gallery,
        State::GallerySelect {
            picture_ref: PictureRef::single("photobooth00001.jpg"),
            action: None,
        },
        State::greeter(shots)?,
        State::countdown(1, shots)?,
        State::capture(1, shots)?,
        State::capture(shots, shots)?,
        State::Assemble,
        State::Review {
            picture: Picture::uniform(Vec::<u8>::new()),
        },
        State::Postprocess {
            picture_ref: None,
            action: None,
        },
        State::error("Camera", "example failure", State::Idle, true)?,
        State::teardown(TeardownTarget::Welcome),
    ])
}

fn sample_events(shots: u32) -> Result<Vec<Event>> {
    let gui = [
        names::START,
        names::EXIT,
        names::TRIGGER,
        names::SLIDESHOW,
        names::UPDATE_SLIDESHOW,
        names::GALLERY,
        names::CLOSE,
        names::POSTPROCESS,
        names::COUNTDOWN,
        names::CAPTURE,
        names::IDLE,
        names::RETRY,
        names::ABORT,
        names::WELCOME,
    ];
    let mut events = gui
        .iter()
        .map(|name| Event::gui(*name))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    events.push(Event::gui_select(PictureRef::single("photobooth00001.jpg"))?);
    events.push(Event::gpio(names::TRIGGER)?);
    events.push(Event::camera_ready(shots)?);
    events.push(Event::camera(names::COUNTDOWN)?);
    events.push(Event::camera(names::ASSEMBLE)?);
    events.push(Event::camera_review(Picture::uniform(Vec::<u8>::new()))?);
    Ok(events)
}

fn transition_rows(shots: u32, all: bool) -> Result<Vec<Row>> {
    let session = Session {
        is_running: true,
        num_shots: shots,
    };
    let events = sample_events(shots)?;
    let mut rows = Vec::new();

    for state in sample_states(shots)? {
        for event in &events {
            let result = match state.next(event, &session) {
                Ok(Transition::Stay) => Some("(stay)".to_string()),
                Ok(Transition::Enter(next)) => Some(next.to_string()),
                Ok(Transition::Start { num_shots }) => {
                    Some(format!("Idle (session of {})", num_shots))
                }
                Err(_) => None,
            };
            if result.is_some() || all {
                rows.push(Row {
                    state: state.to_string(),
                    event: event.to_string(),
                    result,
                });
            }
        }
    }
    Ok(rows)
}

fn print_transitions(shots: u32, output: OutputFormat, all: bool) -> Result<()> {
    let rows = transition_rows(shots, all)?;

    match output {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            term.write_line(&format!(
                "{}",
                style("Transitions").bold().underlined()
            ))
            .ok();
            for row in &rows {
                let result = match &row.result {
                    Some(next) => style(next.clone()).green().to_string(),
                    None => style("unhandled".to_string()).red().dim().to_string(),
                };
                term.write_line(&format!(
                    "  {:<28} {:<26} → {}",
                    row.state,
                    style(&row.event).yellow(),
                    result
                ))
                .ok();
            }
            term.write_line("").ok();
            term.write_line(&format!(
                "  {}",
                style("Error and Teardown events are accepted in every state.").dim()
            ))
            .ok();
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&rows) {
            Ok(json) => println!("{}", json),
            Err(err) => eprintln!("{} {}", style("error:").red().bold(), err),
        },
    }
    Ok(())
}
