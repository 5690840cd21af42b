//! Line-oriented stand-in for the quiz screen.

use std::fmt;
use std::io::Write;

use quiz_core::gesture::CARD_SKIP_AREA;
use quiz_core::model::OptionLabel;
use quiz_core::session::Phase;
use services::{Haptics, Navigator, Notice, Notifier, Route, SessionSnapshot, UserIntent};

/// Platform services backed by stdout/stderr.
#[derive(Debug, Default)]
pub struct TerminalPlatform;

impl Haptics for TerminalPlatform {
    fn notify_error(&self) {
        // Terminal bell.
        let mut err = std::io::stderr();
        let _ = err.write_all(b"\x07");
        let _ = err.flush();
    }
}

impl Navigator for TerminalPlatform {
    fn reset_to(&self, route: Route) {
        println!("-> {}", route.name());
    }

    fn go_back(&self) {
        println!("<- back");
    }
}

impl Notifier for TerminalPlatform {
    fn notify(&self, notice: Notice) {
        if notice.is_blocking() {
            let hint = match notice {
                Notice::LoadFailed => " [retry | quit]",
                Notice::ConfirmExit => " [yes | no]",
                _ => "",
            };
            println!("!! {notice}{hint}");
        } else {
            println!("{notice}");
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(Vec<UserIntent>),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Unknown(String),
    InvalidDistance { raw: String },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown(word) => write!(f, "unknown command: {word} (try `help`)"),
            CommandError::InvalidDistance { raw } => write!(f, "invalid drag distance: {raw}"),
        }
    }
}

impl std::error::Error for CommandError {}

/// A full drag from rest to `distance` and release.
fn drag(distance: f32) -> Vec<UserIntent> {
    vec![
        UserIntent::DragStart,
        UserIntent::DragMove {
            translation_x: distance,
        },
        UserIntent::DragEnd,
    ]
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(Command::Send(Vec::new()));
    };
    let word = first.to_ascii_lowercase();

    if let Ok(option) = word.parse::<OptionLabel>() {
        return Ok(Command::Send(vec![UserIntent::TapOption(option)]));
    }

    let intents = match word.as_str() {
        "ok" | "confirm" => vec![UserIntent::TapConfirm],
        "skip" => drag(CARD_SKIP_AREA - 50.0),
        "drag" => {
            let raw = words.next().unwrap_or_default();
            let distance = raw
                .parse::<f32>()
                .ok()
                .filter(|d| d.is_finite())
                .ok_or_else(|| CommandError::InvalidDistance { raw: raw.to_string() })?;
            drag(distance)
        }
        "back" => vec![UserIntent::Back],
        "yes" => vec![UserIntent::ConfirmExit],
        "no" => vec![UserIntent::CancelExit],
        "retry" => vec![UserIntent::RetryLoad],
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" => return Ok(Command::Quit),
        _ => return Err(CommandError::Unknown(first.to_string())),
    };
    Ok(Command::Send(intents))
}

pub fn print_commands() {
    println!("  a | b | c | d   select (again to clear)");
    println!("  ok              confirm the selected answer");
    println!("  skip            swipe the card left");
    println!("  drag <px>       drag the card horizontally and release");
    println!("  back            leave the quiz (asks first)");
    println!("  yes | no        answer the leave prompt");
    println!("  retry           reload after a failed load");
    println!("  quit            unmount and exit");
}

/// The parts of a snapshot worth redrawing for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenKey {
    index: usize,
    phase: Phase,
    selected: Option<OptionLabel>,
    exit_prompt: bool,
}

impl ScreenKey {
    #[must_use]
    pub fn of(snapshot: &SessionSnapshot) -> Self {
        Self {
            index: snapshot.state.current_index(),
            phase: snapshot.state.phase(),
            selected: snapshot.state.selected_option(),
            exit_prompt: snapshot.exit_prompt,
        }
    }
}

fn progress_bar(fraction: f32, width: usize) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * width as f32).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

pub fn render(snapshot: &SessionSnapshot) {
    let state = &snapshot.state;
    match state.phase() {
        Phase::Loading => println!("Loading questions..."),
        Phase::LoadFailed => {}
        Phase::Finished => println!(
            "{} {}/{} correct",
            progress_bar(1.0, 20),
            state.score(),
            state.questions().len()
        ),
        phase => {
            let Some(question) = state.current_question() else {
                return;
            };
            println!();
            println!(
                "{} {}/{}",
                progress_bar(state.progress(), 20),
                state.current_index() + 1,
                state.questions().len()
            );
            println!("{}", question.text());
            for (label, text) in question.options() {
                let mark = if state.selected_option() == Some(label) {
                    '*'
                } else {
                    ' '
                };
                println!(" {mark} {label}) {text}");
            }
            match phase {
                Phase::Validating { option } => println!("Checking {option}..."),
                Phase::Feedback => println!("Incorrect."),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_select_options() {
        assert_eq!(
            parse_command("C").unwrap(),
            Command::Send(vec![UserIntent::TapOption(OptionLabel::C)])
        );
    }

    #[test]
    fn skip_drags_past_the_threshold() {
        let Command::Send(intents) = parse_command("skip").unwrap() else {
            panic!("expected intents");
        };
        assert!(matches!(
            intents[1],
            UserIntent::DragMove { translation_x } if translation_x < CARD_SKIP_AREA
        ));
        assert_eq!(intents.last(), Some(&UserIntent::DragEnd));
    }

    #[test]
    fn drag_requires_a_number() {
        assert_eq!(
            parse_command("drag far"),
            Err(CommandError::InvalidDistance { raw: "far".into() })
        );
        assert_eq!(parse_command("drag -120").unwrap(), Command::Send(drag(-120.0)));
    }

    #[test]
    fn blank_line_is_a_no_op() {
        assert_eq!(parse_command("   ").unwrap(), Command::Send(Vec::new()));
    }

    #[test]
    fn unknown_words_are_rejected() {
        assert_eq!(
            parse_command("maybe"),
            Err(CommandError::Unknown("maybe".into()))
        );
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(0.5, 4), "[##--]");
        assert_eq!(progress_bar(2.0, 4), "[####]");
    }
}
