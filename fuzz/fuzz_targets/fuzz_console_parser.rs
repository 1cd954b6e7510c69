//! Fuzz target: console line parser
//!
//! Feeds arbitrary UTF-8 to `parse_line` and verifies:
//! - No panics under arbitrary input
//! - Whitespace-only input is always `Empty`
//! - A successfully parsed profile switch carries the name verbatim
//!
//! cargo fuzz run fuzz_console_parser

#![no_main]

use insulinpump::adapters::console::{ConsoleInput, ParseError, parse_line};
use insulinpump::app::commands::DeviceCommand;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    match parse_line(line) {
        Ok(ConsoleInput::Command(DeviceCommand::SwitchProfile(p))) => {
            assert!(line.split_whitespace().nth(1) == Some(p.name.as_str()));
        }
        Ok(_) => {}
        Err(ParseError::Empty) => assert!(line.trim().is_empty()),
        Err(e) => {
            assert!(!line.trim().is_empty());
            let _ = e.to_string();
        }
    }
});
