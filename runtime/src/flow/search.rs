//! Search submission and the switch to chronological results.

use crate::config::FlowOptions;
use crate::harvest::selectors;
use crate::renderer::RenderContext;
use crate::wait::{js_string, wait_for, Condition};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

/// Build the query text, optionally restricted to the last `since_days` days.
pub fn build_query(term: &str, since_days: Option<u32>, today: NaiveDate) -> String {
    let term = term.trim();
    match since_days {
        Some(days) => {
            let since = today - chrono::Duration::days(i64::from(days));
            format!("{term} since:{since} until:{today}")
        }
        None => term.to_string(),
    }
}

/// Submit a search. Returns the query that was entered.
///
/// A missing search box or results that never load is fatal; failing to
/// reach the "Latest" tab only logs a warning.
pub async fn search(ctx: &mut dyn RenderContext, term: &str, opts: &FlowOptions) -> Result<String> {
    let query = build_query(term, opts.since_days, chrono::Utc::now().date_naive());
    tracing::info!("searching for '{query}'");

    let timeout = opts.wait_timeout();
    let poll = opts.poll_interval();

    wait_for(ctx, &[Condition::present(selectors::SEARCH_INPUT)], timeout, poll)
        .await
        .context("search input not found")?;
    ctx.type_into(selectors::SEARCH_INPUT, &query, true)
        .await
        .context("failed to enter search query")?;

    wait_for(
        ctx,
        &[
            Condition::url_contains("search?q="),
            Condition::present(selectors::CARDS),
        ],
        timeout,
        poll,
    )
    .await
    .context("search results did not load")?;
    tracing::info!("search results loaded");
    opts.after_search.pause().await;

    if opts.latest_tab {
        match switch_to_latest(ctx, opts).await {
            Ok(()) => tracing::info!("switched to 'Latest' tab"),
            Err(e) => tracing::warn!(
                "could not switch to 'Latest' tab, continuing with top results: {e:#}"
            ),
        }
    }

    Ok(query)
}

fn click_script(xpath: &str) -> String {
    format!(
        r#"(() => {{
  const node = document.evaluate({xp}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
  if (!node) return false;
  node.click();
  return true;
}})()"#,
        xp = js_string(xpath),
    )
}

async fn switch_to_latest(ctx: &mut dyn RenderContext, opts: &FlowOptions) -> Result<()> {
    let timeout = opts.wait_timeout();
    let poll = opts.poll_interval();

    wait_for(ctx, &[Condition::clickable(selectors::LATEST_TAB)], timeout, poll)
        .await
        .context("'Latest' tab not found")?;

    let clicked = ctx
        .execute_js(&click_script(selectors::LATEST_TAB))
        .await
        .context("failed to click 'Latest' tab")?;
    if !clicked.as_bool().unwrap_or(false) {
        bail!("'Latest' tab disappeared before it could be clicked");
    }

    wait_for(ctx, &[Condition::url_contains("f=live")], timeout, poll)
        .await
        .context("URL never switched to latest results")?;
    opts.after_search.pause().await;
    Ok(())
}
