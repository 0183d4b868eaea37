//! `feedharvest run`: log in, search, harvest the feed, write the CSV.

use crate::cli::prompt::{self, RunInputs};
use crate::config::{HarvestConfig, PauseRange};
use crate::flow::{login, search};
use crate::harvest::surface::DomFeed;
use crate::harvest::{HarvestOutcome, HarvestSession};
use crate::progress::{self, HarvestEventKind, ProgressReceiver};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::{RenderContext, Renderer};
use anyhow::{Context, Result};
use clap::Args;
use feedharvest::{dedup_by_identifier, output_file_name, CsvOptions, CsvWriter};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::task::JoinHandle;

/// Flags for a harvest run. Unset values keep the configured defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Search term (prompted when omitted; blank means "bitcoin")
    #[arg(long)]
    pub query: Option<String>,
    /// Account email or username (prompted when omitted)
    #[arg(long)]
    pub username: Option<String>,
    /// Maximum scroll iterations
    #[arg(long)]
    pub max_scrolls: Option<u32>,
    /// Stop after this many posts
    #[arg(long)]
    pub max_records: Option<usize>,
    /// Minimum pause between scrolls in milliseconds
    #[arg(long)]
    pub pause_min_ms: Option<u64>,
    /// Maximum pause between scrolls in milliseconds
    #[arg(long)]
    pub pause_max_ms: Option<u64>,
    /// Bound for login and search waits in milliseconds
    #[arg(long)]
    pub wait_timeout_ms: Option<u64>,
    /// Only fetch posts from the last N days
    #[arg(long)]
    pub since_days: Option<u32>,
    /// Stay on the default results tab instead of switching to "Latest"
    #[arg(long)]
    pub no_latest: bool,
    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,
    /// Directory for the CSV file
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Path to the Chromium/Chrome binary
    #[arg(long)]
    pub chromium_path: Option<PathBuf>,
    /// Login page URL
    #[arg(long)]
    pub login_url: Option<String>,
    /// Add a ViewsSource column describing where each view count came from
    #[arg(long)]
    pub view_source: bool,
}

impl RunArgs {
    /// Apply the flags on top of environment-aware defaults.
    pub fn into_config(self) -> Result<HarvestConfig> {
        let mut config = HarvestConfig::from_env();

        if let Some(n) = self.max_scrolls {
            config.limits.max_scrolls = n;
        }
        if let Some(n) = self.max_records {
            config.limits.max_records = n;
        }
        let pause = config.limits.scroll_pause;
        config.limits.scroll_pause = PauseRange::new(
            self.pause_min_ms.unwrap_or(pause.min_ms),
            self.pause_max_ms.unwrap_or(pause.max_ms),
        );
        if let Some(ms) = self.wait_timeout_ms {
            config.flow.wait_timeout_ms = ms;
        }
        if let Some(url) = self.login_url {
            config.flow.login_url = url;
        }
        config.flow.since_days = self.since_days;
        config.flow.latest_tab = !self.no_latest;
        config.browser.headless = self.headless;
        if let Some(p) = self.chromium_path {
            config.browser.chromium_path = Some(p);
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        config.include_view_source = self.view_source;

        config.validate()?;
        Ok(config)
    }
}

/// Run the command.
pub async fn run(args: RunArgs, quiet: bool) -> Result<()> {
    let username = args.username.clone();
    let query = args.query.clone();
    let config = args.into_config()?;
    let inputs = prompt::collect(username, query)?;

    let renderer = ChromiumRenderer::launch(&config.browser).await?;
    let result = harvest(&renderer, &config, &inputs, quiet).await;

    // The browser is released whether or not setup succeeded.
    renderer.shutdown().await?;
    let outcome = result?;

    let records = dedup_by_identifier(outcome.records);
    let path = CsvWriter::write_to_dir(
        &records,
        &config.output_dir,
        &output_file_name(&inputs.search_term),
        CsvOptions {
            include_view_source: config.include_view_source,
        },
    )
    .context("failed to write CSV output")?;

    if !quiet {
        println!();
        println!(
            "Scraped {} unique posts for '{}' saved to '{}'",
            records.len(),
            inputs.search_term,
            path.display()
        );
        println!("  Stopped: {}", outcome.stop);
        if outcome.skipped > 0 {
            println!("  Skipped cards: {}", outcome.skipped);
        }
    }
    Ok(())
}

/// Log in, search, and run the loop on a fresh tab.
async fn harvest(
    renderer: &dyn Renderer,
    config: &HarvestConfig,
    inputs: &RunInputs,
    quiet: bool,
) -> Result<HarvestOutcome> {
    let mut ctx = renderer.new_context().await?;

    if let Err(e) = setup(ctx.as_mut(), config, inputs).await {
        let _ = ctx.close().await;
        return Err(e);
    }

    let (tx, rx) = progress::channel();
    let bar = (!quiet).then(|| spawn_progress_bar(rx, config.limits.max_scrolls));

    tracing::info!("starting to harvest posts");
    let outcome = HarvestSession::new(DomFeed::new(ctx.as_ref()), config.limits)
        .with_progress(tx)
        .run()
        .await;

    if let Some(task) = bar {
        let _ = task.await;
    }
    let _ = ctx.close().await;
    Ok(outcome)
}

async fn setup(
    ctx: &mut dyn RenderContext,
    config: &HarvestConfig,
    inputs: &RunInputs,
) -> Result<()> {
    login(ctx, &inputs.credentials, &config.flow)
        .await
        .context("login failed")?;
    search(ctx, &inputs.search_term, &config.flow)
        .await
        .context("search failed")?;
    Ok(())
}

/// Render progress events until the sender is dropped.
fn spawn_progress_bar(mut rx: ProgressReceiver, max_iterations: u32) -> JoinHandle<()> {
    let bar = ProgressBar::new(u64::from(max_iterations));
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:30} {pos}/{len} scrolls  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.event {
                    HarvestEventKind::IterationStarted { iteration, .. } => {
                        bar.set_position(u64::from(iteration));
                    }
                    HarvestEventKind::RecordCaptured { total, .. } => {
                        bar.set_message(format!("{total} posts"));
                    }
                    HarvestEventKind::Stopped { reason, total, .. } => {
                        bar.finish_with_message(format!("{total} posts ({reason})"));
                    }
                    HarvestEventKind::CardsFound { .. } | HarvestEventKind::CardSkipped { .. } => {}
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
        if !bar.is_finished() {
            bar.finish();
        }
    })
}
