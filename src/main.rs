use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;

use phoenix::app::{App, Services};
use phoenix::asr::{Asr, download_model};
use phoenix::audio::Microphone;
use phoenix::clock::SystemClock;
use phoenix::config::Config;
use phoenix::console::StdConsole;
use phoenix::listener::{Listener, Unavailable, VoiceListener};
use phoenix::llm::{Completion, Gemini, ProgrammingHelper};
use phoenix::logging::init_logging;
use phoenix::speech::SystemVoice;
use phoenix::system::{Desktop, TaskList, TempDirs};

/// Voice driven desktop assistant.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to a config.toml, defaults to the user config directory
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Microphone plus Whisper, failing when either cannot be set up.
fn voice_listener(config: &Config) -> Result<VoiceListener> {
    std::fs::create_dir_all(&config.paths.cache_dir).context("Creating cache directory")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let model_path = runtime
        .block_on(download_model(&config.model))
        .context("Failed to download model")?;

    let mut asr = Asr::new(&model_path, &config.model);
    asr.load()?;
    let microphone = Microphone::new(config).context("Failed to open microphone")?;
    Ok(VoiceListener::new(microphone, asr))
}

fn language_model(config: &Config) -> Option<Box<dyn Completion>> {
    match Gemini::from_env(&config.llm) {
        Ok(gemini) => Some(Box::new(gemini)),
        Err(err) => {
            println!("Failed to configure Gemini API: {err}. Programming help will be unavailable.");
            warn!("Programming help disabled: {err}");
            None
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let args = Args::parse();

    let config = if let Some(path) = &args.config {
        Config::from_file(path).context(format!("Reading config {}", path.display()))?
    } else {
        Config::load_or_write_default(None)?
    };

    let speaker = SystemVoice::new(&config.voice).map_err(|err| {
        println!("Failed to initialize TTS engine: {err}");
        err
    })?;

    let helper =
        language_model(&config).map_or_else(ProgrammingHelper::disabled, ProgrammingHelper::new);

    let listener: Box<dyn Listener> = match voice_listener(&config) {
        Ok(listener) => Box::new(listener),
        Err(err) => {
            error!("Voice input unavailable: {err:#}");
            Box::new(Unavailable)
        }
    };

    let services = Services {
        console: Box::new(StdConsole),
        listener,
        speaker: Box::new(speaker),
        helper,
        processes: Box::new(TaskList),
        files: Box::new(TempDirs::from_config(&config.janitor)),
        launcher: Box::new(Desktop),
        clock: Box::new(SystemClock),
    };

    let mut app = App::new(&config, services);
    info!("Starting command loop");
    app.run()?;
    Ok(())
}
