use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use tracing::{error, info, warn};

mod cache;
mod config;
mod images;
mod llm;
mod models;
mod recommend;
mod state;
mod utils;

use config::CONFIG;
use state::AppState;
use utils::logging::init_logging;

#[derive(Debug, PartialEq)]
struct RecommendArgs {
    query: String,
    pretty: bool,
}

#[derive(Debug, PartialEq)]
enum Invocation {
    Run(RecommendArgs),
    Help,
}

fn usage() -> &'static str {
    "Usage: recommend [--pretty] <query...>\n\nPrints related artists, celebrities, movies, anime and fashion brands for <query> as JSON."
}

fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut pretty = false;
    let mut words: Vec<&str> = Vec::new();
    let mut positional_only = false;

    for arg in args.iter().skip(1) {
        if positional_only {
            words.push(arg);
            continue;
        }
        match arg.as_str() {
            "--pretty" | "-p" => pretty = true,
            "--help" | "-h" => return Ok(Invocation::Help),
            "--" => positional_only = true,
            other if other.starts_with("--") => {
                return Err(anyhow!("Unknown argument: {other}\n{}", usage()));
            }
            other => words.push(other),
        }
    }

    let query = words.join(" ").trim().to_string();
    if query.is_empty() {
        return Err(anyhow!("A query is required\n{}", usage()));
    }
    Ok(Invocation::Run(RecommendArgs { query, pretty }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let args = match parse_args(&args)? {
        Invocation::Run(args) => args,
        Invocation::Help => {
            println!("{}", usage());
            return Ok(());
        }
    };

    dotenv().ok();
    let _guards = init_logging();

    if CONFIG.openai_api_key.trim().is_empty() {
        warn!("OPENAI_API_KEY is not set; related items cannot be fetched");
    }

    let state = AppState::from_config(&CONFIG)?;
    info!("Fetching recommendations for '{}'", args.query);

    let recommendations = match state.recommendations.get_recommendations(&args.query).await {
        Ok(recommendations) => recommendations,
        Err(err) => {
            error!("Recommendation request failed: {err}");
            return Err(err.into());
        }
    };

    let output = if args.pretty {
        serde_json::to_string_pretty(&recommendations)?
    } else {
        serde_json::to_string(&recommendations)?
    };
    println!("{output}");
    Ok(())
}
