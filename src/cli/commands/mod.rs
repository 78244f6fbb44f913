use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        PossibleValuesParser, ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};
use url::Url;

use crate::caddie::routes::{canonical, is_protected};
use crate::session::{token::DEFAULT_TOKEN_PREFIX, Role};

// keep in sync with session::token::DEFAULT_ACCEPTED_SUBJECTS
const DEFAULT_SUBJECTS_ARG: &str = "1,2";

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn validator_backend_url() -> ValueParser {
    ValueParser::from(move |raw: &str| -> std::result::Result<Url, String> {
        let url = Url::parse(raw).map_err(|e| format!("invalid URL: {e}"))?;
        match url.scheme() {
            "http" | "https" if url.has_host() => Ok(url),
            "http" | "https" => Err("URL has no host".to_string()),
            scheme => Err(format!("unsupported scheme '{scheme}', expected http or https")),
        }
    })
}

/// A login path under a protected prefix would redirect to itself forever.
pub fn validator_login_path() -> ValueParser {
    ValueParser::from(move |raw: &str| -> std::result::Result<String, String> {
        if !raw.starts_with('/') || raw.contains(['?', '#']) {
            return Err("expected an absolute path like /login".to_string());
        }

        if is_protected(&canonical(raw)) {
            return Err(format!("'{raw}' is a protected path"));
        }

        Ok(raw.to_string())
    })
}

fn token_prefix_arg() -> Arg {
    Arg::new("token-prefix")
        .long("token-prefix")
        .help("Leading segment of session tokens")
        .default_value(DEFAULT_TOKEN_PREFIX)
        .env("CADDIE_TOKEN_PREFIX")
}

fn serve() -> Command {
    Command::new("serve")
        .about("Serve the dashboard behind the session gate")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("CADDIE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("backend-url")
                .long("backend-url")
                .help("Backend API origin, example: https://api.golf.tld")
                .env("CADDIE_BACKEND_URL")
                .required(true)
                .value_parser(validator_backend_url()),
        )
        .arg(
            Arg::new("frontend-dir")
                .long("frontend-dir")
                .help("Directory with the exported frontend build")
                .default_value("./out")
                .env("CADDIE_FRONTEND_DIR"),
        )
        .arg(
            Arg::new("login-path")
                .long("login-path")
                .help("Where unauthenticated visitors are sent")
                .default_value("/login")
                .env("CADDIE_LOGIN_PATH")
                .value_parser(validator_login_path()),
        )
        .arg(
            Arg::new("accepted-subjects")
                .long("accepted-subjects")
                .help("Comma separated user ids allowed to hold a session")
                .default_value(DEFAULT_SUBJECTS_ARG)
                .env("CADDIE_ACCEPTED_SUBJECTS")
                .value_delimiter(','),
        )
        .arg(token_prefix_arg())
        .arg(
            Arg::new("secure-cookies")
                .long("secure-cookies")
                .help("Mark session cookies Secure")
                .env("CADDIE_SECURE_COOKIES")
                .action(ArgAction::SetTrue),
        )
}

fn token() -> Command {
    Command::new("token")
        .about("Mint a session token for local testing")
        .arg(
            Arg::new("subject")
                .short('s')
                .long("subject")
                .help("User id embedded in the token")
                .required(true),
        )
        .arg(
            Arg::new("role")
                .short('r')
                .long("role")
                .help("Also print Set-Cookie values for a profile with this role")
                .value_parser(PossibleValuesParser::new(Role::ALL.map(Role::as_str))),
        )
        .arg(token_prefix_arg())
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("caddie")
        .about("Session gate and API proxy for the golf operations dashboard")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(serve())
        .subcommand(token())
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("CADDIE_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .help("Emit logs as JSON lines")
                .env("CADDIE_LOG_JSON")
                .global(true)
                .action(ArgAction::SetTrue),
        )
}
