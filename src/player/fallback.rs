//! Fallback channel used when automated playback gives up.
//!
//! In a browser the fallback is a new browsing context (`window.open`); on
//! the command line it is an external program such as `xdg-open`.

use std::process::{Command, Stdio};
use tracing::{debug, error, info};

/// Opens the original resource out of band and drives the countdown UI
pub trait FallbackOpener {
    /// Open `url` in a new context. Has no failure path visible to the caller.
    fn open(&mut self, url: &str);

    /// Escalation countdown changed; `remaining_secs` reaches 0 right before `open`
    fn countdown(&mut self, _remaining_secs: u32) {}

    /// Escalation UI should be hidden (playback started or attempt restarted)
    fn dismiss(&mut self) {}
}

/// Launches an external command with the URL as its last argument
#[derive(Debug, Clone)]
pub struct CommandOpener {
    program: String,
    args: Vec<String>,
}

impl CommandOpener {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a configured command line such as `"mpv --fs"` into program and arguments
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Spawn the command detached from our stdio
    pub fn launch(&self, url: &str) -> std::io::Result<()> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
    }
}

impl FallbackOpener for CommandOpener {
    fn open(&mut self, url: &str) {
        info!("Opening {} with {}", url, self.program);
        if let Err(e) = self.launch(url) {
            error!("Failed to launch '{}': {}", self.program, e);
        }
    }

    fn countdown(&mut self, remaining_secs: u32) {
        if remaining_secs > 0 {
            info!("Playback did not start, opening source in {}s", remaining_secs);
        }
    }

    fn dismiss(&mut self) {
        debug!("Escalation dismissed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_line() {
        let opener = CommandOpener::from_command_line("mpv --fs  --no-terminal").unwrap();
        assert_eq!(opener.program(), "mpv");
        assert_eq!(opener.args(), ["--fs", "--no-terminal"]);
    }

    #[test]
    fn blank_command_line_is_rejected() {
        assert!(CommandOpener::from_command_line("   ").is_none());
    }

    #[test]
    fn missing_program_reports_spawn_error() {
        let opener = CommandOpener::new("definitely-not-a-real-program-dramashort", vec![]);
        assert!(opener.launch("https://x/v.mp4").is_err());
    }
}
