use std::io::{self, BufRead};
use std::str::FromStr;
use std::thread;

use facecam_core::detection::domain::detection_request::DetectionMode;
use facecam_core::pipeline::viewfinder::ViewfinderControl;
use facecam_core::shared::orientation::DeviceOrientation;

pub const HELP: &str = "Commands: mode <rectangles|landmarks>, orientation <name>, \
stop, start, status, quit";

/// One line typed on stdin while the viewfinder runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Mode(DetectionMode),
    Orientation(DeviceOrientation),
    Stop,
    Start,
    Status,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["mode", mode] => mode.parse().map(Command::Mode),
            ["orientation", orientation] => orientation.parse().map(Command::Orientation),
            ["stop"] => Ok(Command::Stop),
            ["start"] => Ok(Command::Start),
            ["status"] => Ok(Command::Status),
            ["quit"] | ["q"] => Ok(Command::Quit),
            _ => Err(format!("unrecognized command '{}'", line.trim())),
        }
    }
}

impl Command {
    pub fn apply(self, control: &ViewfinderControl) {
        match self {
            Command::Mode(mode) => control.set_detection_mode(mode),
            Command::Orientation(orientation) => control.set_device_orientation(orientation),
            Command::Stop => {
                control.stop();
            }
            Command::Start => {
                control.start();
            }
            Command::Status => match control.status() {
                Some(status) => {
                    let source = status
                        .source
                        .map(|s| format!("{} {}x{} @ {:.1} fps", s.name, s.width, s.height, s.fps))
                        .unwrap_or_else(|| "closed".into());
                    println!(
                        "running: {}, frames delivered: {}, source: {source}",
                        status.running, status.frames_delivered
                    );
                }
                None => println!("session has shut down"),
            },
            Command::Quit => {
                control.finish();
            }
        }
    }
}

/// Reads commands from stdin until it closes. The thread is left detached;
/// the process exits once the viewfinder has finished.
pub fn spawn_stdin_reader(control: ViewfinderControl) {
    let spawned = thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => command.apply(&control),
                    Err(e) => eprintln!("{e}. {HELP}"),
                }
            }
            log::debug!("stdin closed; runtime commands disabled");
        });
    if let Err(e) = spawned {
        log::warn!("Could not read commands from stdin: {e}");
    }
}
