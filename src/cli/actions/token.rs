use crate::session::{now_ms, Role, SessionCookies, TokenPolicy, UserProfile};
use anyhow::{Context, Result};

#[derive(Debug)]
pub struct Args {
    pub subject: String,
    pub role: Option<Role>,
    pub token_prefix: String,
}

/// Print a freshly minted token, plus matching `Set-Cookie` values when a role
/// is given.
/// # Errors
/// Returns an error if the subject cannot be encoded into a token.
pub fn execute(args: &Args) -> Result<()> {
    for line in render(args, now_ms())? {
        println!("{line}");
    }
    Ok(())
}

fn render(args: &Args, now_ms: u64) -> Result<Vec<String>> {
    let token = TokenPolicy::new(args.token_prefix.as_str())
        .issue(&args.subject, now_ms)
        .with_context(|| format!("cannot mint a token for subject '{}'", args.subject))?;

    let Some(role) = args.role else {
        return Ok(vec![token]);
    };

    let profile = UserProfile::new(args.subject.as_str(), role);
    let cookies = SessionCookies::new(false).set(&token, &profile)?;

    let mut lines = vec![token];
    for cookie in cookies {
        lines.push(format!("Set-Cookie: {}", cookie.to_str()?));
    }
    Ok(lines)
}
