use crate::cli::actions::{server, token, Action};
use crate::session::Role;
use anyhow::{anyhow, ensure, Context, Result};
use std::path::PathBuf;
use url::Url;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("serve", sub_m)) => serve(sub_m),
        Some(("token", sub_m)) => token(sub_m),
        _ => Err(anyhow!("unknown subcommand")),
    }
}

fn token_prefix(matches: &clap::ArgMatches) -> Result<String> {
    let prefix = matches
        .get_one::<String>("token-prefix")
        .cloned()
        .context("missing required argument: --token-prefix")?;
    ensure!(
        !prefix.is_empty() && !prefix.contains('-'),
        "token prefix must be non-empty and cannot contain '-'"
    );
    Ok(prefix)
}

fn serve(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let backend_url = matches
        .get_one::<Url>("backend-url")
        .cloned()
        .context("missing required argument: --backend-url")?;
    let frontend_dir = matches
        .get_one::<String>("frontend-dir")
        .map_or_else(|| PathBuf::from("./out"), PathBuf::from);
    let login_path = matches
        .get_one::<String>("login-path")
        .cloned()
        .context("missing required argument: --login-path")?;
    let accepted_subjects: Vec<String> = matches
        .get_many::<String>("accepted-subjects")
        .map(|values| {
            values
                .map(|subject| subject.trim().to_string())
                .filter(|subject| !subject.is_empty())
                .collect()
        })
        .unwrap_or_default();
    ensure!(
        !accepted_subjects.is_empty(),
        "at least one accepted subject is required"
    );

    Ok(Action::Server(server::Args {
        port,
        backend_url,
        frontend_dir,
        login_path,
        accepted_subjects,
        token_prefix: token_prefix(matches)?,
        secure_cookies: matches.get_flag("secure-cookies"),
    }))
}

fn token(matches: &clap::ArgMatches) -> Result<Action> {
    let subject = matches
        .get_one::<String>("subject")
        .cloned()
        .context("missing required argument: --subject")?;
    let role = matches
        .get_one::<String>("role")
        .map(|name| {
            Role::ALL
                .into_iter()
                .find(|role| role.as_str() == name.as_str())
                .with_context(|| format!("unknown role: {name}"))
        })
        .transpose()?;

    Ok(Action::Token(token::Args {
        subject,
        role,
        token_prefix: token_prefix(matches)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn dispatch(args: &[&str]) -> Result<Action> {
        let matches = commands::new().try_get_matches_from(args)?;
        handler(&matches)
    }

    #[test]
    fn serve_action() {
        temp_env::with_vars_unset(["CADDIE_TOKEN_PREFIX", "CADDIE_ACCEPTED_SUBJECTS"], || {
            let action = dispatch(&[
                "caddie",
                "serve",
                "--backend-url",
                "http://127.0.0.1:9000",
                "--accepted-subjects",
                " 1, ,5",
            ]);
            let Ok(Action::Server(args)) = action else {
                panic!("expected server action");
            };
            assert_eq!(args.accepted_subjects, ["1", "5"]);
            assert_eq!(args.token_prefix, "token");
            assert_eq!(args.backend_url.as_str(), "http://127.0.0.1:9000/");
        });
    }

    #[test]
    fn serve_rejects_dashed_prefix() {
        let action = dispatch(&[
            "caddie",
            "serve",
            "--backend-url",
            "http://127.0.0.1:9000",
            "--token-prefix",
            "a-b",
        ]);
        assert!(action.is_err());
    }

    #[test]
    fn token_action() {
        temp_env::with_vars_unset(["CADDIE_TOKEN_PREFIX"], || {
            let action = dispatch(&["caddie", "token", "--subject", "2", "--role", "DEVELOPER"]);
            let Ok(Action::Token(args)) = action else {
                panic!("expected token action");
            };
            assert_eq!(args.subject, "2");
            assert_eq!(args.role, Some(Role::Developer));
        });
    }
}
