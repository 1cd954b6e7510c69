//! Line-oriented console front panel.
//!
//! Turns one line of user input into a [`ConsoleInput`].  The parser is
//! pure: it never touches the device, so it is safe to fuzz.
//!
//! The accepted grammar is listed in [`HELP`].

use core::fmt;
use core::str::FromStr;

use crate::app::commands::DeviceCommand;
use crate::profile::Profile;

pub const HELP: &str = "\
commands:
  on | off | unlock
  rate <n> | pause | resume
  carbs <grams>
  calc <glucose> <carbs> | override <units>
  deliver | extended <percent-now> <delay-min> | cancel
  profile <name> <basal> <carb-ratio> <correction> <target>
  charge | refill
  cgm | occlude            toggle CGM link / pump occlusion fault
  status | help | quit";

/// What the user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Command(DeviceCommand),
    ToggleCgmFault,
    TogglePumpFault,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnknownCommand(String),
    MissingArgument(&'static str),
    BadNumber(&'static str),
    TrailingInput,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty input"),
            Self::UnknownCommand(word) => write!(f, "unknown command '{word}' (try 'help')"),
            Self::MissingArgument(what) => write!(f, "missing argument: {what}"),
            Self::BadNumber(what) => write!(f, "not a valid number: {what}"),
            Self::TrailingInput => write!(f, "unexpected extra arguments"),
        }
    }
}

impl std::error::Error for ParseError {}

struct Args<'a> {
    words: core::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn word(&mut self, what: &'static str) -> Result<&'a str, ParseError> {
        self.words.next().ok_or(ParseError::MissingArgument(what))
    }

    fn number<T: FromStr>(&mut self, what: &'static str) -> Result<T, ParseError> {
        self.word(what)?
            .parse()
            .map_err(|_| ParseError::BadNumber(what))
    }

    fn finish(mut self) -> Result<(), ParseError> {
        match self.words.next() {
            Some(_) => Err(ParseError::TrailingInput),
            None => Ok(()),
        }
    }
}

/// Parse one console line.
pub fn parse_line(line: &str) -> Result<ConsoleInput, ParseError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(ParseError::Empty);
    };
    let mut args = Args { words };

    let input = match head.to_ascii_lowercase().as_str() {
        "on" => ConsoleInput::Command(DeviceCommand::PowerOn),
        "off" => ConsoleInput::Command(DeviceCommand::PowerOff),
        "unlock" => ConsoleInput::Command(DeviceCommand::Unlock),
        "rate" => ConsoleInput::Command(DeviceCommand::SetSimRate(args.number("rate")?)),
        "pause" => ConsoleInput::Command(DeviceCommand::Pause),
        "resume" => ConsoleInput::Command(DeviceCommand::Resume),
        "carbs" => ConsoleInput::Command(DeviceCommand::CarbIntake {
            grams: args.number("grams")?,
        }),
        "calc" => ConsoleInput::Command(DeviceCommand::CalculateDose {
            glucose: args.number("glucose")?,
            carbs: args.number("carbs")?,
        }),
        "override" => ConsoleInput::Command(DeviceCommand::OverrideDose(args.number("units")?)),
        "deliver" => ConsoleInput::Command(DeviceCommand::ConfirmDeliver),
        "extended" => ConsoleInput::Command(DeviceCommand::StartExtendedBolus {
            percent_now: args.number("percent-now")?,
            delay_minutes: args.number("delay-min")?,
        }),
        "cancel" => ConsoleInput::Command(DeviceCommand::CancelBolus),
        "profile" => ConsoleInput::Command(DeviceCommand::SwitchProfile(Profile {
            name: args.word("name")?.to_owned(),
            basal_rate: args.number("basal")?,
            carb_ratio: args.number("carb-ratio")?,
            correction_factor: args.number("correction")?,
            target_glucose: args.number("target")?,
        })),
        "charge" => ConsoleInput::Command(DeviceCommand::ChargeBattery),
        "refill" => ConsoleInput::Command(DeviceCommand::RefillInsulin),
        "cgm" => ConsoleInput::ToggleCgmFault,
        "occlude" => ConsoleInput::TogglePumpFault,
        "status" => ConsoleInput::Status,
        "help" | "?" => ConsoleInput::Help,
        "quit" | "exit" | "q" => ConsoleInput::Quit,
        _ => return Err(ParseError::UnknownCommand(head.to_owned())),
    };
    args.finish()?;
    Ok(input)
}
