// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use midly::live::LiveEvent;
use midly::num::{u4, u7};
use midly::MidiMessage;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sampler_engine::audio::cpal::{default_sample_rate, find_device, list_devices, OutputStream};
use sampler_engine::audio::wav::read_wav;
use sampler_engine::config::EngineConfig;
use sampler_engine::midi::MidiRouter;
use sampler_engine::samples::{SampleId, SampleRecord, SamplerEngine};

/// How often to check for voices that have finished their release.
const DRAIN_POLL: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A keyboard-driven sampler."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Plays notes from a WAV file through an audio device.
    Play {
        /// The WAV file to play.
        path: PathBuf,
        /// The device name to play through. Uses the default output device if unset.
        #[arg(short, long)]
        device: Option<String>,
        /// MIDI notes played together, comma separated. 60 plays the file as is.
        #[arg(short, long, value_delimiter = ',', default_value = "60")]
        notes: Vec<u8>,
        /// How long the notes are held before they are released.
        #[arg(long, default_value = "2s")]
        hold_for: String,
        /// Loop the sample while the notes are held.
        #[arg(short, long = "loop")]
        looping: bool,
        /// The path to an engine config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = list_devices()?;
            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Play {
            path,
            device,
            notes,
            hold_for,
            looping,
            config,
        } => play(&path, device.as_deref(), &notes, &hold_for, looping, config)?,
    }

    Ok(())
}

fn play(
    path: &Path,
    device_name: Option<&str>,
    notes: &[u8],
    hold_for: &str,
    looping: bool,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let hold_for: Duration = DurationString::from_string(hold_for.to_string())?.into();
    let device = find_device(device_name)?;
    let config = match config_path {
        Some(config_path) => EngineConfig::from_file(&config_path)?,
        None => EngineConfig::new(),
    }
    .or_sample_rate(default_sample_rate(&device)?);

    let buffer = read_wav(path)?;
    let (engine, mixer) = SamplerEngine::new(&config)?;
    let engine = Arc::new(engine);
    let stream = OutputStream::start(&device, mixer)?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sample".to_string());
    let id = SampleId::new(name.clone());
    let mut record = SampleRecord::new(id.clone());
    record.name = name;
    engine.load_sample(record, buffer)?;
    engine.set_selected_sample_ids(vec![id.clone()]);
    engine.set_loop(looping);

    let router = MidiRouter::new(engine.clone());
    for &note in notes {
        router.handle(&note_message(note, true)?)?;
    }
    info!(
        device = stream.device_name(),
        notes = ?notes,
        looping,
        "Holding notes for {:?}",
        hold_for
    );
    thread::sleep(hold_for);

    for &note in notes {
        router.handle(&note_message(note, false)?)?;
    }

    let release = engine
        .get_sample_settings(&id)
        .map(|s| Duration::from_secs_f64(s.envelope.release_time))
        .unwrap_or_default();
    let deadline = Instant::now() + release + config.release_tail()? + Duration::from_secs(1);
    while engine.active_voice_count() > 0 && Instant::now() < deadline {
        thread::sleep(DRAIN_POLL);
    }

    engine.teardown();
    Ok(())
}

/// Encodes a channel 1 note on or note off.
fn note_message(note: u8, on: bool) -> Result<Vec<u8>, Box<dyn Error>> {
    let key = u7::try_from(note).ok_or_else(|| format!("note {} is out of range", note))?;
    let message = if on {
        MidiMessage::NoteOn {
            key,
            vel: u7::new(100),
        }
    } else {
        MidiMessage::NoteOff {
            key,
            vel: u7::new(0),
        }
    };

    let mut bytes = Vec::new();
    LiveEvent::Midi {
        channel: u4::new(0),
        message,
    }
    .write_std(&mut bytes)?;
    Ok(bytes)
}
