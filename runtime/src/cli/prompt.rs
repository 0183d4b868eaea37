//! Interactive prompts for credentials and the search term.

use crate::config::{DEFAULT_SEARCH_TERM, ENV_PASSWORD};
use crate::flow::Credentials;
use anyhow::{bail, Context, Result};
use dialoguer::{Input, Password};

/// Everything the user supplies for one run.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub credentials: Credentials,
    pub search_term: String,
}

/// Blank search terms fall back to the default.
pub fn resolve_search_term(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_SEARCH_TERM.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Ask for whatever was not given on the command line.
///
/// The password is never echoed; `FEEDHARVEST_PASSWORD` skips its prompt.
pub fn collect(username: Option<String>, query: Option<String>) -> Result<RunInputs> {
    let username = match username {
        Some(u) if !u.trim().is_empty() => u.trim().to_string(),
        _ => Input::<String>::new()
            .with_prompt("Enter your account email or username")
            .interact_text()
            .context("failed to read username")?
            .trim()
            .to_string(),
    };
    if username.is_empty() {
        bail!("a username is required");
    }

    let password = match std::env::var(ENV_PASSWORD) {
        Ok(p) if !p.is_empty() => p,
        _ => Password::new()
            .with_prompt("Enter your account password (hidden)")
            .interact()
            .context("failed to read password")?,
    };

    let search_term = match query {
        Some(q) => resolve_search_term(&q),
        None => {
            let raw: String = Input::new()
                .with_prompt(format!("Enter search term (e.g., {DEFAULT_SEARCH_TERM})"))
                .allow_empty(true)
                .interact_text()
                .context("failed to read search term")?;
            resolve_search_term(&raw)
        }
    };

    Ok(RunInputs {
        credentials: Credentials { username, password },
        search_term,
    })
}
