//! Interactive console – stands in for the IR remote and the camera models.
//!
//! Each line is one command:
//!
//! | Input | Effect |
//! |---|---|
//! | `up`, `down`, `left`, `right`, `tl`, `tr` | drive keys |
//! | `0`–`9`, `+`, `-`, `power`, `light`, `sound` | remaining remote keys |
//! | `gesture <name> [x]` | a classified gesture as a direct input event |
//! | `face <x> <y>` | a face held in view at a normalized position |
//! | `face <x> <y> <w> <h>` | a face held in view as a pixel box |
//! | `hand <name> [x]` | a hand held in view of the camera |
//! | `clear` | nothing in view |
//! | `distance <cm>` | set the range sensor reading |
//! | `status` | print actuator and capture state |
//! | `help`, `quit` | |

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::warn;
use trackbot_hal::sim::SimProbe;
use trackbot_perception::{DetectionFeed, PixelBox};
use trackbot_types::{DetectionLabel, DetectionResult, Gesture, InputEvent, RemoteKey};

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Input(InputEvent),
    Face { x: f32, y: f32 },
    FaceBox(PixelBox),
    Hand { gesture: Gesture, x: f32 },
    Clear,
    Distance(f32),
    Status,
    Help,
    Quit,
}

/// Handles the console needs to act on the simulated robot.
pub struct Console {
    pub events: Sender<InputEvent>,
    pub faces: DetectionFeed,
    pub hands: DetectionFeed,
    pub probe: SimProbe,
    pub shutdown: Arc<AtomicBool>,
    /// Camera resolution used to normalize pixel boxes.
    pub frame_size: (u32, u32),
}

pub fn parse(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".to_string());
    };
    let args: Vec<&str> = words.collect();

    let command = match head.to_ascii_lowercase().as_str() {
        "face" if args.len() == 4 => {
            let px = |i: usize| {
                args[i]
                    .parse::<u32>()
                    .map_err(|_| "usage: face <x> <y> <w> <h> (pixels)".to_string())
            };
            Command::FaceBox(PixelBox::new(px(0)?, px(1)?, px(2)?, px(3)?))
        }
        "face" => {
            let x = number(args.first(), "face <x> <y>")?;
            let y = number(args.get(1), "face <x> <y>")?;
            Command::Face { x, y }
        }
        "hand" => Command::Hand {
            gesture: gesture(args.first())?,
            x: optional_number(args.get(1))?,
        },
        "gesture" => Command::Input(InputEvent::gesture(
            gesture(args.first())?,
            optional_number(args.get(1))?,
        )),
        "distance" => Command::Distance(number(args.first(), "distance <cm>")?),
        "clear" => Command::Clear,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Input(InputEvent::remote(
            remote_key(other).ok_or_else(|| format!("unknown command '{other}'"))?,
        )),
    };
    Ok(command)
}

fn number(word: Option<&&str>, usage: &str) -> Result<f32, String> {
    word.and_then(|w| w.parse::<f32>().ok())
        .ok_or_else(|| format!("usage: {usage}"))
}

fn optional_number(word: Option<&&str>) -> Result<f32, String> {
    match word {
        None => Ok(0.0),
        Some(w) => w.parse::<f32>().map_err(|_| format!("not a number: '{w}'")),
    }
}

fn gesture(word: Option<&&str>) -> Result<Gesture, String> {
    let name = word.ok_or_else(|| "missing gesture name".to_string())?;
    let gesture = match name.to_ascii_lowercase().as_str() {
        "open_palm" | "palm" => Gesture::OpenPalm,
        "fist" => Gesture::Fist,
        "thumbs_up" => Gesture::ThumbsUp,
        "thumbs_down" => Gesture::ThumbsDown,
        "peace" => Gesture::Peace,
        "pointing" | "point" => Gesture::Pointing,
        "ok_sign" | "ok" => Gesture::OkSign,
        "three" => Gesture::Three,
        "four" => Gesture::Four,
        "unknown" => Gesture::Unknown,
        other => return Err(format!("unknown gesture '{other}'")),
    };
    Ok(gesture)
}

fn remote_key(word: &str) -> Option<RemoteKey> {
    let key = match word {
        "power" | "stop" => RemoteKey::Power,
        "up" => RemoteKey::Up,
        "down" => RemoteKey::Down,
        "left" => RemoteKey::Left,
        "right" => RemoteKey::Right,
        "tl" | "turn_left" => RemoteKey::TurnLeft,
        "tr" | "turn_right" => RemoteKey::TurnRight,
        "light" => RemoteKey::Light,
        "sound" => RemoteKey::Sound,
        "+" | "plus" => RemoteKey::Plus,
        "-" | "minus" => RemoteKey::Minus,
        "0" => RemoteKey::Zero,
        "1" => RemoteKey::One,
        "2" => RemoteKey::Two,
        "3" => RemoteKey::Three,
        "4" => RemoteKey::Four,
        "5" => RemoteKey::Five,
        "6" => RemoteKey::Six,
        "7" => RemoteKey::Seven,
        "8" => RemoteKey::Eight,
        "9" => RemoteKey::Nine,
        _ => return None,
    };
    Some(key)
}

impl Console {
    /// Read lines until `quit`, EOF, Ctrl-C or the shutdown flag is set.
    pub fn run(self) {
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                warn!(error = %e, "console unavailable");
                return;
            }
        };

        while !self.shutdown.load(Ordering::SeqCst) {
            let line = match editor.readline("trackbot> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                    self.shutdown.store(true, Ordering::SeqCst);
                    break;
                }
                Err(e) => {
                    eprintln!("{}: {}", "Read error".red(), e);
                    self.shutdown.store(true, Ordering::SeqCst);
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let _ = editor.add_history_entry(line);

            match parse(line) {
                Ok(Command::Quit) => {
                    println!("{}", "Goodbye.".green());
                    self.shutdown.store(true, Ordering::SeqCst);
                    break;
                }
                Ok(command) => self.execute(command),
                Err(e) => println!(
                    "{} {}. Type {} for available commands.",
                    "Error:".red(),
                    e,
                    "help".bold()
                ),
            }
        }
    }

    fn execute(&self, command: Command) {
        match command {
            Command::Input(event) => {
                if self.events.send(event).is_err() {
                    println!("{}", "control loop has stopped".yellow());
                }
            }
            Command::Face { x, y } => {
                self.faces
                    .hold(vec![DetectionResult::new(DetectionLabel::Face, x, y, 0.9)]);
            }
            Command::FaceBox(bbox) => {
                let (width, height) = self.frame_size;
                self.faces.hold(vec![bbox.to_detection(
                    DetectionLabel::Face,
                    0.9,
                    width,
                    height,
                )]);
            }
            Command::Hand { gesture, x } => {
                self.hands.hold(vec![DetectionResult::new(
                    DetectionLabel::Hand(gesture),
                    x,
                    0.0,
                    0.9,
                )]);
            }
            Command::Clear => {
                self.faces.clear();
                self.hands.clear();
            }
            Command::Distance(cm) => self.probe.set_distance(cm),
            Command::Status => self.print_status(),
            Command::Help => print_help(),
            Command::Quit => {}
        }
    }

    fn print_status(&self) {
        println!("{}", "Status".bold().underline());
        match self.probe.last_drive() {
            Some(cmd) => println!(
                "  drive   : linear {:>6.1}  lateral {:>6.1}  angular {:>6.1}",
                cmd.linear_velocity, cmd.lateral_velocity, cmd.angular_velocity
            ),
            None => println!("  drive   : {}", "no command yet".dimmed()),
        }
        let w = self.probe.wheels();
        println!(
            "  wheels  : FL {:>4}  RL {:>4}  FR {:>4}  RR {:>4}",
            w.front_left, w.rear_left, w.front_right, w.rear_right
        );
        if let Some(servo) = self.probe.last_servo() {
            println!("  servo   : pan {:.1}°  tilt {:.1}°", servo.pan, servo.tilt);
        }
        let light = self
            .probe
            .light()
            .map(|c| format!("{c:?}"))
            .unwrap_or_else(|| "off".to_string());
        println!("  lights  : {light}");
        println!(
            "  sonar   : {}",
            if self.probe.distance_enabled() { "on" } else { "off" }
        );
    }
}

pub fn print_help() {
    println!();
    println!("{}", "trackbot console".bold().underline());
    println!("  {}  – drive (manual mode)", "up down left right tl tr".bold().cyan());
    println!("  {}              – gesture / face tracking / obstacle avoidance", "1 2 3".bold().cyan());
    println!("  {}    – stop, speed, lights", "power + - light".bold().cyan());
    println!("  {}  – inject a gesture event", "gesture <name> [x]".bold().cyan());
    println!("  {}        – put a face in view", "face <x> <y>".bold().cyan());
    println!("  {}  – put a face in view (pixels)", "face <x> <y> <w> <h>".bold().cyan());
    println!("  {}    – put a hand in view", "hand <name> [x]".bold().cyan());
    println!("  {}               – nothing in view", "clear".bold().cyan());
    println!("  {}       – set range sensor reading", "distance <cm>".bold().cyan());
    println!("  {}        – show actuator state", "status".bold().cyan());
    println!("  {}    – exit", "quit  exit".bold().cyan());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_remote_keys() {
        assert_eq!(
            parse("up").unwrap(),
            Command::Input(InputEvent::remote(RemoteKey::Up))
        );
        assert_eq!(
            parse("  3 ").unwrap(),
            Command::Input(InputEvent::remote(RemoteKey::Three))
        );
        assert_eq!(
            parse("+").unwrap(),
            Command::Input(InputEvent::remote(RemoteKey::Plus))
        );
        assert_eq!(
            parse("POWER").unwrap(),
            Command::Input(InputEvent::remote(RemoteKey::Power))
        );
    }

    #[test]
    fn parses_gesture_events() {
        assert_eq!(
            parse("gesture pointing -0.5").unwrap(),
            Command::Input(InputEvent::gesture(Gesture::Pointing, -0.5))
        );
        assert_eq!(
            parse("gesture thumbs_up").unwrap(),
            Command::Input(InputEvent::gesture(Gesture::ThumbsUp, 0.0))
        );
    }

    #[test]
    fn parses_scene_commands() {
        assert_eq!(
            parse("face 0.4 -0.2").unwrap(),
            Command::Face { x: 0.4, y: -0.2 }
        );
        assert_eq!(
            parse("hand peace").unwrap(),
            Command::Hand {
                gesture: Gesture::Peace,
                x: 0.0
            }
        );
        assert_eq!(
            parse("face 288 208 64 64").unwrap(),
            Command::FaceBox(PixelBox::new(288, 208, 64, 64))
        );
        assert_eq!(parse("distance 25").unwrap(), Command::Distance(25.0));
        assert_eq!(parse("clear").unwrap(), Command::Clear);
        assert_eq!(parse("exit").unwrap(), Command::Quit);
    }

    #[test]
    fn face_box_is_normalized_against_camera_size() {
        use std::sync::mpsc;
        use trackbot_hal::sim::SimHardware;
        use trackbot_perception::{Detector, DetectorFamily, ScriptedDetector};
        use trackbot_types::Frame;

        let (mut detector, faces) = ScriptedDetector::new(DetectorFamily::Face);
        let (_, hands) = ScriptedDetector::new(DetectorFamily::Gesture);
        let (events, _inputs) = mpsc::channel();
        let (_, probe) = SimHardware::new().build();
        let console = Console {
            events,
            faces,
            hands,
            probe,
            shutdown: Arc::new(AtomicBool::new(false)),
            frame_size: (640, 480),
        };

        console.execute(parse("face 288 208 64 64").unwrap());
        let seen = detector.detect(&Frame::new(4, 4, vec![0; 16], 1)).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!((seen[0].center_x, seen[0].center_y), (0.0, 0.0));
        assert_eq!(seen[0].width, Some(0.1));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse("").is_err());
        assert!(parse("warp 9").is_err());
        assert!(parse("face 0.1").is_err());
        assert!(parse("face 1 2 three 4").is_err());
        assert!(parse("hand jazz").is_err());
        assert!(parse("gesture fist left").is_err());
    }
}
