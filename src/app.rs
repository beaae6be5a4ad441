//! Main application loop and command handlers.
//!
//! [`App`] reads one utterance per iteration, either typed or spoken,
//! classifies it and runs the matching handler. Every collaborator it talks
//! to (console, microphone, speech, language model, OS) is injected through
//! [`Services`], constructed once at startup.

use std::io;

use log::{debug, error, info, warn};

use crate::clock::{Clock, date_report, time_report};
use crate::command::{Command, CommandSet};
use crate::config::{AppLauncher, Config};
use crate::console::Console;
use crate::error::Error;
use crate::janitor::{Janitor, confirms};
use crate::listener::{Capture, Listener};
use crate::llm::ProgrammingHelper;
use crate::speech::Speaker;
use crate::system::{FileSystem, Launcher, ProcessController};

pub const CHOICE_PROMPT: &str = "\nPress Enter to use voice, or type 'text' to write a command: ";
pub const TEXT_PROMPT: &str = "You: ";

const CLEAN_WARNING: &str = "Warning: This will close all non-essential applications, and you will lose any unsaved work. Are you sure you want to continue?";

/// Handles to everything outside the process.
pub struct Services {
    pub console: Box<dyn Console>,
    pub listener: Box<dyn Listener>,
    pub speaker: Box<dyn Speaker>,
    pub helper: ProgrammingHelper,
    pub processes: Box<dyn ProcessController>,
    pub files: Box<dyn FileSystem>,
    pub launcher: Box<dyn Launcher>,
    pub clock: Box<dyn Clock>,
}

/// One line read from the console.
enum Input {
    Line(String),
    /// The line was not valid text and is skipped
    Unreadable,
    Closed,
}

/// Whether the loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct App {
    name: String,
    commands: CommandSet,
    janitor: Janitor,
    services: Services,
}

impl App {
    pub fn new(config: &Config, services: Services) -> Self {
        Self {
            name: config.voice.name.clone(),
            commands: CommandSet::new(config.apps.clone()),
            janitor: Janitor::from_config(&config.janitor),
            services,
        }
    }

    /// Greets the user and processes commands until the exit phrase.
    ///
    /// Closing the console input also ends the loop.
    pub fn run(&mut self) -> io::Result<()> {
        self.say(&format!("Hello! I am your {}.", self.name));
        loop {
            let Some(capture) = self.acquire()? else {
                info!("Input closed, exiting");
                return Ok(());
            };
            if self.step(capture)? == Flow::Stop {
                info!("Done exiting");
                return Ok(());
            }
        }
    }

    /// Reads one utterance: typed after answering `text`, spoken otherwise.
    ///
    /// Returns `None` once the console input is closed.
    fn acquire(&mut self) -> io::Result<Option<Capture>> {
        let choice = match self.read_input(CHOICE_PROMPT)? {
            Input::Line(choice) => choice,
            Input::Unreadable => return Ok(Some(Capture::NoSpeech)),
            Input::Closed => return Ok(None),
        };
        if choice.trim().eq_ignore_ascii_case("text") {
            return Ok(match self.read_input(TEXT_PROMPT)? {
                Input::Line(line) => Some(Capture::heard(&line)),
                Input::Unreadable => Some(Capture::NoSpeech),
                Input::Closed => None,
            });
        }
        Ok(Some(self.services.listener.capture()))
    }

    fn read_input(&mut self, prompt: &str) -> io::Result<Input> {
        match self.services.console.read_line(prompt) {
            Ok(Some(line)) => Ok(Input::Line(line)),
            Ok(None) => Ok(Input::Closed),
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                warn!("Ignoring unreadable input: {err}");
                Ok(Input::Unreadable)
            }
            Err(err) => Err(err),
        }
    }

    /// Handles one acquired utterance.
    pub fn step(&mut self, capture: Capture) -> io::Result<Flow> {
        let utterance = match capture {
            Capture::Heard(utterance) => utterance,
            Capture::Timeout => {
                self.say("I didn't hear anything.");
                return Ok(Flow::Continue);
            }
            Capture::NoSpeech | Capture::ServiceError => return Ok(Flow::Continue),
        };

        let Some(command) = self.commands.classify(&utterance) else {
            debug!("Ignoring {utterance:?}");
            return Ok(Flow::Continue);
        };
        debug!("{utterance:?} -> {command:?}");

        match command {
            Command::AggressiveClean => self.aggressive_clean()?,
            Command::Optimize => self.optimize(),
            Command::Open(app) => {
                let app = app.clone();
                self.open(&app);
            }
            Command::Time => {
                let report = time_report(self.services.clock.now());
                self.say(&report);
            }
            Command::Date => {
                let report = date_report(self.services.clock.now());
                self.say(&report);
            }
            Command::ProgrammingQuestion => {
                self.say("Getting a programming answer for you...");
                let answer = self.services.helper.answer(&utterance);
                self.say(&answer);
            }
            Command::Exit => {
                self.say("Goodbye!");
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    /// Prints and speaks. Speech failures are logged, the text was still printed.
    fn say(&mut self, text: &str) {
        println!("{}: {text}", self.name);
        if let Err(err) = self.services.speaker.speak(text) {
            error!("Could not speak: {err}");
        }
    }

    fn open(&mut self, app: &AppLauncher) {
        self.say(&format!("Opening {}.", app.name));
        if let Err(err) = self.services.launcher.launch(&app.target) {
            error!("Could not open {}: {err}", app.name);
            self.say(&format!("Sorry, I couldn't open {}.", app.name));
        }
    }

    fn optimize(&mut self) {
        self.say("Starting laptop optimization.");
        self.say("Closing common background processes.");
        self.janitor
            .close_background_apps(self.services.processes.as_mut());
        self.say("Cleaning temporary files.");
        let deleted = self.janitor.clean_temp_files(self.services.files.as_ref());
        self.say(&format!(
            "Optimization complete. Cleaned up {deleted} temporary files."
        ));
    }

    fn aggressive_clean(&mut self) -> io::Result<()> {
        self.say(CLEAN_WARNING);
        let reply = self.acquire()?.unwrap_or(Capture::NoSpeech);
        if !confirms(&reply) {
            info!("Aggressive clean declined with {reply:?}");
            self.say("Aggressive clean cancelled.");
            return Ok(());
        }

        self.say("Proceeding with aggressive clean. Terminating all non-essential processes.");
        match self
            .janitor
            .terminate_unlisted(self.services.processes.as_mut())
        {
            Ok(attempts) => self.say(&format!(
                "Aggressive clean complete. Terminated {attempts} processes."
            )),
            Err(Error::Unsupported(reason)) => {
                warn!("Cannot list processes: {reason}");
                self.say("Error: tasklist command not found. This feature is for Windows only.");
            }
            Err(err) => {
                error!("Aggressive clean failed: {err}");
                self.say(&format!("An error occurred: {err}"));
            }
        }
        Ok(())
    }
}
