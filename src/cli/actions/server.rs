use crate::caddie::{self, config::GateConfig, GIT_COMMIT_HASH};
use crate::cli::telemetry;
use crate::session::TokenPolicy;
use anyhow::Result;
use std::path::PathBuf;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub backend_url: Url,
    pub frontend_dir: PathBuf,
    pub login_path: String,
    pub accepted_subjects: Vec<String>,
    pub token_prefix: String,
    pub secure_cookies: bool,
}

impl Args {
    #[must_use]
    pub fn gate_config(&self) -> GateConfig {
        let policy = TokenPolicy::new(self.token_prefix.as_str())
            .with_accepted_subjects(self.accepted_subjects.iter().map(String::as_str));

        GateConfig::new(self.backend_url.clone())
            .with_frontend_dir(self.frontend_dir.clone())
            .with_login_path(self.login_path.as_str())
            .with_token_policy(policy)
            .with_secure_cookies(self.secure_cookies)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let result = caddie::new(args.port, args.gate_config()).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("backend_url", redact_url(&args.backend_url)),
        ("frontend_dir", args.frontend_dir.display().to_string()),
        ("login_path", args.login_path.clone()),
        ("accepted_subjects", args.accepted_subjects.join(",")),
        ("token_prefix", args.token_prefix.clone()),
        ("secure_cookies", args.secure_cookies.to_string()),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_url(url: &Url) -> String {
    let mut url = url.clone();
    if url.password().is_some() {
        let _ = url.set_password(Some("REDACTED"));
    }
    url.to_string()
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\n{title}:", caddie_banner());
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn caddie_banner() -> String {
    CADDIE_BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_commit(GIT_COMMIT_HASH)),
    )
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    trimmed.chars().take(7).collect()
}

const CADDIE_BANNER: &str = r"
        |>
        |
        |
   .----+----.  C A D D I E {VERSION}
  (     o     )
   `---------'";
