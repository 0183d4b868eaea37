//! Bounded polling waits on page state.
//!
//! A wait polls a set of conditions until one holds or the timeout elapses.
//! Callers decide whether a [`WaitTimeout`] is fatal (login/search setup) or
//! merely skips an optional step.

use crate::renderer::RenderContext;
use anyhow::Result;
use std::time::{Duration, Instant};

/// A page-state condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// An element matching the XPath exists.
    XPathPresent(String),
    /// An element matching the XPath exists, is rendered, and is not disabled.
    XPathClickable(String),
    /// The current URL contains the substring.
    UrlContains(String),
}

impl Condition {
    pub fn present(xpath: impl Into<String>) -> Self {
        Self::XPathPresent(xpath.into())
    }

    pub fn clickable(xpath: impl Into<String>) -> Self {
        Self::XPathClickable(xpath.into())
    }

    pub fn url_contains(needle: impl Into<String>) -> Self {
        Self::UrlContains(needle.into())
    }

    fn describe(&self) -> String {
        match self {
            Self::XPathPresent(x) => format!("element {x}"),
            Self::XPathClickable(x) => format!("clickable element {x}"),
            Self::UrlContains(s) => format!("URL containing '{s}'"),
        }
    }

    async fn holds(&self, ctx: &dyn RenderContext) -> Result<bool> {
        match self {
            Self::UrlContains(needle) => Ok(ctx.get_url().await?.contains(needle.as_str())),
            Self::XPathPresent(xpath) => {
                let value = ctx.execute_js(&xpath_present_script(xpath, false)).await?;
                Ok(value.as_bool().unwrap_or(false))
            }
            Self::XPathClickable(xpath) => {
                let value = ctx.execute_js(&xpath_present_script(xpath, true)).await?;
                Ok(value.as_bool().unwrap_or(false))
            }
        }
    }
}

/// No condition held before the deadline.
#[derive(Debug, thiserror::Error)]
#[error("timed out after {waited_ms}ms waiting for {what}")]
pub struct WaitTimeout {
    pub what: String,
    pub waited_ms: u64,
}

/// Quote a string as a JavaScript literal.
pub fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Script evaluating to `true` when an element matches `xpath`.
pub fn xpath_present_script(xpath: &str, clickable: bool) -> String {
    let check = if clickable {
        "node.getClientRects().length > 0 && !node.disabled"
    } else {
        "true"
    };
    format!(
        r#"(() => {{
  const node = document.evaluate({xp}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
  return node !== null && ({check});
}})()"#,
        xp = js_string(xpath),
    )
}

/// Poll until any condition holds; returns the index of the first one that did.
///
/// Script errors while polling (e.g. mid-navigation) count as "not yet".
pub async fn wait_for(
    ctx: &dyn RenderContext,
    conditions: &[Condition],
    timeout: Duration,
    poll: Duration,
) -> std::result::Result<usize, WaitTimeout> {
    let start = Instant::now();
    loop {
        for (i, condition) in conditions.iter().enumerate() {
            match condition.holds(ctx).await {
                Ok(true) => return Ok(i),
                Ok(false) => {}
                Err(e) => tracing::trace!("wait condition check failed: {e:#}"),
            }
        }

        if start.elapsed() >= timeout {
            let what = conditions
                .iter()
                .map(Condition::describe)
                .collect::<Vec<_>>()
                .join(" or ");
            return Err(WaitTimeout {
                what,
                waited_ms: start.elapsed().as_millis() as u64,
            });
        }
        tokio::time::sleep(poll).await;
    }
}
