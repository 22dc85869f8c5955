use std::io::BufRead;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use metronome::app::settings::JsonFileStore;
use metronome::audio::device::OutputDeviceManager;
use metronome::audio::parameters::AtomicF32;
use metronome::{ClickSoundType, CpalProvider, EngineConfig, MetronomeHandle, PlaybackController};

/// Refresh period of the terminal pulse display
const UI_TICK: Duration = Duration::from_millis(10);

const HELP: &str = "\
Commands:
  <space> | p     start / stop
  t               tap tempo
  + | -           tempo +1 / -1 BPM
  bpm <n>         set tempo
  ts <n>          beats per bar
  sub <x>         subdivision (1, 1.5, 2, 4)
  sound [name]    classic, rimShot, woodblock, stick, electronic, bell
                  (no name: next sound)
  accent | mute   toggle downbeat accent / sound
  vol <0-100>     output volume
  h               this help
  q               quit";

#[derive(Parser)]
#[command(name = "metronome", about = "Terminal metronome")]
struct Args {
    /// List audio output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Output device name (default device when omitted)
    #[arg(long, value_name = "NAME")]
    device: Option<String>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.list_devices {
        for device in OutputDeviceManager::new().list_output_devices() {
            let marker = if device.is_default { " (default)" } else { "" };
            println!("{}{}", device.name, marker);
        }
        return;
    }

    let engine_config = EngineConfig::default();
    let mut provider = CpalProvider::new(engine_config.clone());
    if let Some(name) = args.device {
        provider = provider.with_device(name);
    }
    let volume = provider.volume();
    let engine = match MetronomeHandle::spawn(provider, engine_config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return;
        }
    };

    println!("=== Metronome ===");
    println!("{}\n", HELP);

    let store = match JsonFileStore::default_location() {
        Ok(store) => store,
        Err(e) => {
            log::warn!("{}, saving settings in the current directory", e);
            JsonFileStore::new(".metronome")
        }
    };

    log::info!("Settings stored in {}", store.dir().display());

    let mut controller = match PlaybackController::new(engine, store) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return;
        }
    };
    print_status(&controller);

    // stdin is blocking: read it on its own thread
    let (line_tx, line_rx) = crossbeam_channel::unbounded::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines().map_while(Result::ok) {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let started = Instant::now();
    loop {
        match line_rx.recv_timeout(UI_TICK) {
            Ok(line) => {
                if !handle_line(&mut controller, &volume, &line, started) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        for event in controller.poll_feedback(Instant::now()) {
            if event.is_downbeat {
                println!("  ** {}", event.beat_number);
            } else {
                println!("  .  {}", event.beat_number);
            }
        }
    }

    controller.stop();
    println!("Bye");
}

/// Returns false when the user asked to quit
fn handle_line<S: metronome::app::SettingsStore>(
    controller: &mut PlaybackController<S>,
    volume: &AtomicF32,
    line: &str,
    started: Instant,
) -> bool {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or(" ");
    let argument = parts.next();

    let result = match (command, argument) {
        (" " | "p", _) => controller.toggle().map(|playing| {
            println!("{}", if playing { "Playing" } else { "Stopped" });
        }),
        ("t", _) => {
            if let Some(bpm) = controller.tap(started.elapsed()) {
                println!("Tap tempo: {} BPM", bpm);
            }
            Ok(())
        }
        ("+", _) => {
            println!("{} BPM", controller.increment_bpm());
            Ok(())
        }
        ("-", _) => {
            println!("{} BPM", controller.decrement_bpm());
            Ok(())
        }
        ("bpm", Some(value)) => match value.parse::<f64>() {
            Ok(bpm) => {
                println!("{} BPM", controller.set_bpm(bpm));
                Ok(())
            }
            Err(_) => {
                println!("Not a number: {}", value);
                Ok(())
            }
        },
        ("ts", Some(value)) => match value.parse::<u32>() {
            Ok(beats) => controller.set_time_signature(beats),
            Err(_) => {
                println!("Not a number: {}", value);
                Ok(())
            }
        },
        ("sub", Some(value)) => match value.parse::<f64>() {
            Ok(multiplier) => controller.set_subdivision(multiplier),
            Err(_) => {
                println!("Not a number: {}", value);
                Ok(())
            }
        },
        ("sound", Some(name)) => match name.parse::<ClickSoundType>() {
            Ok(sound) => controller.set_sound_type(sound),
            Err(e) => {
                println!("{}", e);
                Ok(())
            }
        },
        ("sound", None) => {
            let next = controller.settings().click_sound_type.next();
            controller.set_sound_type(next)
        }
        ("accent", _) => {
            let enabled = !controller.settings().accent_on_downbeat;
            controller.set_accent_on_downbeat(enabled)
        }
        ("mute", _) => {
            let enabled = !controller.settings().sound_enabled;
            controller.set_sound_enabled(enabled)
        }
        ("vol", Some(value)) => match value.parse::<f32>() {
            Ok(percent) => {
                volume.set(percent.clamp(0.0, 100.0) / 100.0);
                println!("Volume {:.0}%", volume.get() * 100.0);
                Ok(())
            }
            Err(_) => {
                println!("Not a number: {}", value);
                Ok(())
            }
        },
        ("h" | "help", _) => {
            println!("{}", HELP);
            Ok(())
        }
        ("q" | "quit", _) => return false,
        _ => {
            println!("Unknown command, 'h' for help");
            Ok(())
        }
    };

    match result {
        Ok(()) => print_status(controller),
        Err(e) => eprintln!("ERROR: {}", e),
    }
    true
}

fn print_status<S: metronome::app::SettingsStore>(controller: &PlaybackController<S>) {
    let s = controller.settings();
    log::info!(
        "{} BPM, {} beats/bar x{}, sound {} ({} / {} Hz), accent {}, sound {}",
        s.bpm,
        s.time_signature,
        s.subdivision_multiplier,
        s.click_sound_type,
        s.accent_frequency,
        s.beat_frequency,
        if s.accent_on_downbeat { "on" } else { "off" },
        if s.sound_enabled { "on" } else { "off" },
    );
}
