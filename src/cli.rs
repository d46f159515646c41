use mlb_api::config::{ConfigLayer, parse_timeout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Tui,
    /// Poll once, print the sensor as JSON, exit.
    Json,
    /// Poll forever, one JSON line per cycle.
    Watch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run { mode: Mode, overrides: ConfigLayer },
    Help,
    Version,
}

pub fn parse_args<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = Mode::default();
    let mut overrides = ConfigLayer::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_owned(), Some(value.to_owned())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Missing value for {name}"))
        };

        match flag.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "-t" | "--team" => overrides.team_id = Some(value("--team")?),
            "-n" | "--name" => overrides.name = Some(value("--name")?),
            "--timeout" => {
                let raw = value("--timeout")?;
                overrides.timeout = Some(parse_timeout(&raw).map_err(|e| e.to_string())?);
            }
            "--json" => mode = Mode::Json,
            "--watch" => mode = Mode::Watch,
            _ => return Err(format!("Unknown argument: {arg}")),
        }
    }

    Ok(Command::Run { mode, overrides })
}

pub fn usage_text() -> &'static str {
    "mlbtui - follow one MLB team's game from ESPN

Usage:
  mlbtui [--team <ABBR>] [--name <NAME>] [--timeout <SECS>]
  mlbtui --json  [options]   poll once and print the sensor as JSON
  mlbtui --watch [options]   poll continuously, one JSON line per update
  mlbtui --help
  mlbtui --version

Options:
  -t, --team <ABBR>    ESPN team abbreviation, e.g. NYY (required)
  -n, --name <NAME>    Sensor display name (default MLB)
      --timeout <SECS> Request timeout in seconds (default 120)

Environment:
  MLBTUI_TEAM_ID, MLBTUI_NAME, MLBTUI_TIMEOUT   same as the options above
  MLBTUI_CONFIG        Path to a JSON config file
                       (default $XDG_CONFIG_HOME/mlbtui/config.json)
  RUST_LOG             Log level (error, warn, info, debug, trace)"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_args_runs_tui_without_overrides() {
        assert_eq!(
            parse(&[]),
            Ok(Command::Run { mode: Mode::Tui, overrides: ConfigLayer::default() })
        );
    }

    #[test]
    fn options_fill_the_cli_layer() {
        let Ok(Command::Run { mode, overrides }) =
            parse(&["--team", "NYY", "--name=Yanks", "--timeout", "30", "--json"])
        else {
            panic!("expected a run command");
        };
        assert_eq!(mode, Mode::Json);
        assert_eq!(overrides.team_id.as_deref(), Some("NYY"));
        assert_eq!(overrides.name.as_deref(), Some("Yanks"));
        assert_eq!(overrides.timeout, Some(30));
    }

    #[test]
    fn short_flags_and_watch() {
        let Ok(Command::Run { mode, overrides }) = parse(&["-t", "sea", "--watch"]) else {
            panic!("expected a run command");
        };
        assert_eq!(mode, Mode::Watch);
        assert_eq!(overrides.team_id.as_deref(), Some("sea"));
    }

    #[test]
    fn help_and_version_short_circuit() {
        assert_eq!(parse(&["--team", "NYY", "-h"]), Ok(Command::Help));
        assert_eq!(parse(&["-V"]), Ok(Command::Version));
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(parse(&["--bogus"]).unwrap_err().contains("--bogus"));
        assert!(parse(&["--team"]).unwrap_err().contains("Missing value"));
        assert!(parse(&["--timeout", "0"]).is_err());
    }
}
