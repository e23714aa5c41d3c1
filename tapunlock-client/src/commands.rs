//! Operator command parsing
//!
//! Parses the lines typed at the `tapunlock record` prompt.

/// Parsed operator command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin recording taps
    Start,
    /// Stop recording and fetch the recorded pattern
    Stop,
    /// Ask the service to watch for the recorded pattern
    Confirm,
    /// Go back one step
    Retry,
    /// Install the confirmed pattern
    Finish,
    /// Reconnect to the detection service now
    Connect,
    /// Show the current session state
    Status,
    /// List the commands
    Help,
    /// Leave the prompt
    Quit,
}

/// Error parsing a command
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Empty command
    Empty,
    /// Command not recognized
    Unknown(String),
    /// Command takes no arguments
    UnexpectedArgument(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty command"),
            ParseError::Unknown(cmd) => write!(f, "unknown command '{}' (try 'help')", cmd),
            ParseError::UnexpectedArgument(arg) => write!(f, "unexpected argument '{}'", arg),
        }
    }
}

impl std::error::Error for ParseError {}

/// Help text printed by the `help` command
pub const HELP: &str = "\
commands:
  start    begin recording taps
  stop     stop recording and fetch the pattern
  confirm  tap the recorded pattern again to confirm it
  retry    go back one step
  finish   install the confirmed pattern
  connect  reconnect to the detection service
  status   show where you are
  quit     leave without installing";

/// Parse a command line into a Command
///
/// Commands are case-insensitive. Most have a one letter shorthand: `s`,
/// `p`, `c`, `r`, `f`, `h` and `q`; `connect` is `co`.
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let mut words = input.split_whitespace();
    let word = words.next().ok_or(ParseError::Empty)?.to_ascii_lowercase();

    if let Some(extra) = words.next() {
        return Err(ParseError::UnexpectedArgument(extra.to_string()));
    }

    let command = match word.as_str() {
        "start" | "s" => Command::Start,
        "stop" | "p" => Command::Stop,
        "confirm" | "c" => Command::Confirm,
        "retry" | "r" => Command::Retry,
        "finish" | "f" => Command::Finish,
        "connect" | "co" => Command::Connect,
        "status" => Command::Status,
        "help" | "h" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => return Err(ParseError::Unknown(word)),
    };

    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_names() {
        assert_eq!(parse_command("start"), Ok(Command::Start));
        assert_eq!(parse_command("stop"), Ok(Command::Stop));
        assert_eq!(parse_command("confirm"), Ok(Command::Confirm));
        assert_eq!(parse_command("retry"), Ok(Command::Retry));
        assert_eq!(parse_command("finish"), Ok(Command::Finish));
        assert_eq!(parse_command("connect"), Ok(Command::Connect));
        assert_eq!(parse_command("status"), Ok(Command::Status));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
        assert_eq!(parse_command("exit"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_abbreviations() {
        assert_eq!(parse_command("s"), Ok(Command::Start));
        assert_eq!(parse_command("p"), Ok(Command::Stop));
        assert_eq!(parse_command("c"), Ok(Command::Confirm));
        assert_eq!(parse_command("co"), Ok(Command::Connect));
        assert_eq!(parse_command("?"), Ok(Command::Help));
    }

    #[test]
    fn test_parse_case_and_whitespace() {
        assert_eq!(parse_command("  START \n"), Ok(Command::Start));
        assert_eq!(parse_command("Finish"), Ok(Command::Finish));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_command(""), Err(ParseError::Empty));
        assert_eq!(parse_command("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            parse_command("unlock"),
            Err(ParseError::Unknown("unlock".into()))
        );
    }

    #[test]
    fn test_parse_extra_argument() {
        assert_eq!(
            parse_command("start now"),
            Err(ParseError::UnexpectedArgument("now".into()))
        );
    }

    #[test]
    fn test_parse_error_display() {
        assert_eq!(ParseError::Empty.to_string(), "empty command");
        assert!(ParseError::Unknown("x".into()).to_string().contains("help"));
    }
}
