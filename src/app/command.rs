//! Command parsing for the command line

/// Parsed command from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Jump to a section by id or title: :goto <target>
    Goto(String),
    /// Run a search: :search <query>
    Search(String),
    /// Toggle a bookmark on the current section: :bookmark
    Bookmark,
    /// Open the template browser: :templates
    Templates,
    /// Open the progress panel: :progress
    Progress,
    /// Forget all progress and copy statistics: :reset-progress
    ResetProgress,
    /// Show help: :help or :h
    Help,
    /// Quit the application: :q or :quit
    Quit,
    /// Clear message: (empty command)
    Nop,
}

/// Result of parsing a command
#[derive(Debug)]
pub enum ParseResult {
    Ok(Command),
    UnknownCommand(String),
    /// Command needs an argument
    MissingArgument(String),
}

fn with_argument(name: &str, args: &str, build: fn(String) -> Command) -> ParseResult {
    if args.is_empty() {
        ParseResult::MissingArgument(name.to_string())
    } else {
        ParseResult::Ok(build(args.to_string()))
    }
}

/// Parse a command string (without the leading :)
pub fn parse_command(input: &str) -> ParseResult {
    let input = input.trim();

    if input.is_empty() {
        return ParseResult::Ok(Command::Nop);
    }

    let mut parts = input.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("");
    let args = parts.next().map(str::trim).unwrap_or("");

    match cmd.to_lowercase().as_str() {
        "goto" | "g" => with_argument("goto", args, Command::Goto),
        "search" | "s" => with_argument("search", args, Command::Search),
        "bookmark" | "bm" => ParseResult::Ok(Command::Bookmark),
        "templates" | "t" => ParseResult::Ok(Command::Templates),
        "progress" | "p" => ParseResult::Ok(Command::Progress),
        "reset-progress" => ParseResult::Ok(Command::ResetProgress),
        "help" | "h" | "?" => ParseResult::Ok(Command::Help),
        "quit" | "q" => ParseResult::Ok(Command::Quit),
        _ => ParseResult::UnknownCommand(cmd.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_command() {
        assert!(matches!(parse_command("q"), ParseResult::Ok(Command::Quit)));
        assert!(matches!(parse_command("quit"), ParseResult::Ok(Command::Quit)));
        assert!(matches!(parse_command("Q"), ParseResult::Ok(Command::Quit)));
    }

    #[test]
    fn parse_goto_keeps_spaces() {
        match parse_command("goto  quick start ") {
            ParseResult::Ok(Command::Goto(target)) => assert_eq!(target, "quick start"),
            other => panic!("Expected Goto, got {other:?}"),
        }
    }

    #[test]
    fn parse_goto_missing_arg() {
        assert!(matches!(parse_command("goto"), ParseResult::MissingArgument(name) if name == "goto"));
    }

    #[test]
    fn parse_search_command() {
        assert!(matches!(parse_command("search bug report"), ParseResult::Ok(Command::Search(q)) if q == "bug report"));
        assert!(matches!(parse_command("s"), ParseResult::MissingArgument(_)));
    }

    #[test]
    fn parse_panel_commands() {
        assert!(matches!(parse_command("bookmark"), ParseResult::Ok(Command::Bookmark)));
        assert!(matches!(parse_command("templates"), ParseResult::Ok(Command::Templates)));
        assert!(matches!(parse_command("progress"), ParseResult::Ok(Command::Progress)));
        assert!(matches!(parse_command("reset-progress"), ParseResult::Ok(Command::ResetProgress)));
    }

    #[test]
    fn parse_unknown_command() {
        assert!(matches!(parse_command("unknown"), ParseResult::UnknownCommand(c) if c == "unknown"));
    }

    #[test]
    fn parse_empty_is_nop() {
        assert!(matches!(parse_command(""), ParseResult::Ok(Command::Nop)));
        assert!(matches!(parse_command("   "), ParseResult::Ok(Command::Nop)));
    }
}
