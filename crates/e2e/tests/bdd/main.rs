//! ITAS BDD scenarios
//!
//! Runs every feature under `crates/e2e/features` against the configured
//! environment. Configuration comes from the process environment (see
//! `.env.example`); cucumber's own flags (`--name`, `--tags`, ...) work as
//! usual.
//!
//! ```text
//! ENV=stg BROWSER=firefox cargo test -p itas-e2e --test bdd -- --tags @smoke
//! ```

mod steps;
mod world;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use cucumber::{cli, writer, World as _, WriterExt as _};
use tracing::{error, info};

use itas_common::Config;
use itas_e2e::{Harness, Hooks, ScenarioStatus};

use world::UiWorld;

/// Harness options on top of cucumber's own
#[derive(clap::Args)]
struct HarnessOpts {
    /// Directory for screenshots and reports (overrides REPORT_DIR)
    #[arg(long, env = "REPORT_DIR")]
    report_dir: Option<PathBuf>,

    /// Show the browser window (overrides HEADLESS)
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let opts = cli::Opts::<_, _, _, HarnessOpts>::parsed();

    let mut config = Config::from_env()?;
    if let Some(dir) = &opts.custom.report_dir {
        config.report_dir = dir.clone();
    }
    if opts.custom.headed {
        config.browser.headless = false;
    }
    info!("ITAS harness v{}", itas_common::VERSION);

    let parallel = config.parallel;
    let report_dir = config.report_dir.clone();
    let hooks = Arc::new(Hooks::new(Harness::from_config(config)));
    hooks.before_all().await?;

    let json = File::create(report_dir.join("cucumber-report.json"))?;
    let features = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("features");

    let before = hooks.clone();
    let after = hooks.clone();
    UiWorld::cucumber()
        .max_concurrent_scenarios(parallel)
        .before(move |_feature, _rule, _scenario, world| {
            let hooks = before.clone();
            Box::pin(async move {
                world.attach(hooks.harness().world());
                // A panic here fails the scenario before its first step
                if let Err(e) = hooks.before_scenario(world.scenario()).await {
                    panic!("Scenario setup failed: {}", e);
                }
            })
        })
        .after(move |feature, _rule, scenario, finished, world| {
            let hooks = after.clone();
            Box::pin(async move {
                let status = ScenarioStatus::from(finished);
                match world.and_then(|w| w.scenario_mut()) {
                    Some(world) => {
                        hooks
                            .after_scenario(world, &feature.name, &scenario.name, status)
                            .await;
                    }
                    None => hooks.record_without_world(&feature.name, &scenario.name, status),
                }
            })
        })
        .with_writer(
            writer::Basic::stdout()
                .summarized()
                .tee::<UiWorld, _>(writer::Json::for_tee(json))
                .normalized(),
        )
        .with_cli(opts)
        .run(features)
        .await;

    hooks.after_all().await?;

    let summary = hooks.report().summary();
    if summary.failed > 0 {
        error!("{} of {} scenario(s) failed", summary.failed, summary.total);
        std::process::exit(1);
    }
    Ok(())
}
