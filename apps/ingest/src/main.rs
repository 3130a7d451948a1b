mod cli;

use clap::Parser;
use color_eyre::Result;
use std::process::ExitCode;

use cli::CliArgs;
use tech_radar_ingest::auth::{PromptConsent, PromptInput};
use tech_radar_ingest::config::init_app_config;
use tech_radar_ingest::net::HttpFetcher;
use tech_radar_ingest::presenter::Presenter;
use tech_radar_ingest::render::{ConsolePresenter, OutputFormat};
use tech_radar_ingest::{ClassifiedError, LoadOutcome, Pipeline};

const AWAITING_INPUT: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Setup error handling
    color_eyre::install()?;

    let args = CliArgs::parse();
    args.apply_env_overrides();
    init_logging(args.debug);

    // Pipe-friendly output when stdout is not a terminal
    let format = if args.json || !is_terminal() {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config = match init_app_config() {
        Ok(config) => config,
        Err(error) => {
            ConsolePresenter::new(format).show_error(&ClassifiedError::invalid_config(&error));
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut presenter = ConsolePresenter::new(format).with_branding(config.branding.clone());
    let input = PromptInput::stdin();
    let mut consent = PromptConsent::new(config.access_token.clone(), config.account.clone());
    if !args.no_prompt {
        consent = consent.with_input(input.clone());
    }
    let fetcher = HttpFetcher::new()?;
    let mut pipeline = Pipeline::new(config, fetcher, consent);

    let mut outcome = pipeline.load(&args.locator(), &mut presenter).await;
    while outcome.is_unauthorized() && !args.no_prompt && confirm_switch_account(&input).await? {
        outcome = pipeline.switch_account(&mut presenter).await;
    }

    Ok(match outcome {
        LoadOutcome::Rendered(_) => ExitCode::SUCCESS,
        LoadOutcome::AwaitingInput => ExitCode::from(AWAITING_INPUT),
        LoadOutcome::Failed(_) => ExitCode::FAILURE,
    })
}

fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp_millis().init();
}

async fn confirm_switch_account(input: &PromptInput) -> Result<bool> {
    let answer = input.ask("Switch account? [y/N] ").await?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

// Check if we're running in a terminal
fn is_terminal() -> bool {
    atty::is(atty::Stream::Stdout)
}
