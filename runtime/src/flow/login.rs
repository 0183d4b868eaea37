//! Login through the site's own sign-in form.

use crate::config::FlowOptions;
use crate::harvest::selectors;
use crate::renderer::RenderContext;
use crate::wait::{wait_for, Condition};
use anyhow::{Context, Result};

/// Account credentials entered at the prompts.
#[derive(Clone)]
pub struct Credentials {
    /// Email, phone, or username.
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Log in. Any missing field or a login that never redirects is fatal.
pub async fn login(
    ctx: &mut dyn RenderContext,
    credentials: &Credentials,
    opts: &FlowOptions,
) -> Result<()> {
    tracing::info!("attempting to log in");
    ctx.navigate(&opts.login_url, opts.wait_timeout_ms)
        .await
        .context("failed to open login page")?;

    let timeout = opts.wait_timeout();
    let poll = opts.poll_interval();

    wait_for(ctx, &[Condition::present(selectors::LOGIN_USERNAME)], timeout, poll)
        .await
        .context("username field not found")?;
    ctx.type_into(selectors::LOGIN_USERNAME, &credentials.username, true)
        .await
        .context("failed to enter username")?;
    opts.after_username.pause().await;

    // Either the password field or a second identifier prompt comes next.
    let next = wait_for(
        ctx,
        &[
            Condition::present(selectors::LOGIN_PASSWORD),
            Condition::present(selectors::LOGIN_CONFIRM),
        ],
        timeout,
        poll,
    )
    .await
    .context("password field not found")?;

    if next == 1 {
        tracing::info!("confirmation step detected, entering identifier again");
        ctx.type_into(selectors::LOGIN_CONFIRM, &credentials.username, true)
            .await
            .context("failed to enter confirmation identifier")?;
        opts.after_username.pause().await;

        wait_for(ctx, &[Condition::present(selectors::LOGIN_PASSWORD)], timeout, poll)
            .await
            .context("password field not found")?;
    } else {
        tracing::debug!("no confirmation step");
    }

    ctx.type_into(selectors::LOGIN_PASSWORD, &credentials.password, true)
        .await
        .context("failed to enter password")?;

    // Profiles needing completion land on settings instead of home.
    wait_for(
        ctx,
        &[
            Condition::url_contains("home"),
            Condition::url_contains("feed"),
            Condition::url_contains("settings"),
        ],
        timeout,
        poll,
    )
    .await
    .context("login did not complete")?;

    tracing::info!("successfully logged in");
    opts.after_login.pause().await;
    Ok(())
}
