//! Shastra CLI — indicator analysis runs and one-off indicator computations.
//!
//! Commands:
//! - `analyze`: run the Load → Analyze → Tools → Terminate pipeline for a symbol
//! - `indicator ma-crossover` / `indicator price-crossover`: compute one
//!   spread series and print its JSON payload
//!
//! Logs go to stderr (`RUST_LOG` overrides the `info` default) so stdout only
//! carries results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use shastra_core::data::{PriceSource, SyntheticSource};
use shastra_core::indicators::IndicatorRequest;
use shastra_runner::{
    ChatCompletionsConfig, DecisionConfig, Pipeline, RulesConfig, RunRequest, ShastraConfig,
};

#[derive(Parser)]
#[command(
    name = "shastra",
    about = "Shastra CLI — spread indicators and agentic indicator analysis"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load price data, let the decision maker call one indicator, print the verdict.
    Analyze {
        #[command(flatten)]
        source: SourceArgs,

        /// Decision backend. Overrides the config file.
        #[arg(long, value_enum)]
        backend: Option<Backend>,

        /// Capability invocations allowed for this run. Overrides the config file.
        #[arg(long)]
        max_invocations: Option<usize>,

        /// Print the full run report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Compute one indicator directly.
    Indicator {
        #[command(subcommand)]
        indicator: IndicatorCommand,
    },
}

#[derive(Subcommand)]
enum IndicatorCommand {
    /// Fast vs slow moving-average spread (fast / slow - 1).
    MaCrossover {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        fast_ma: usize,

        #[arg(long)]
        slow_ma: usize,
    },
    /// Close vs moving-average spread (close / ma - 1).
    PriceCrossover {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        ma: usize,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Symbol to analyze (e.g., RELIANCE).
    #[arg(long)]
    symbol: String,

    /// Bar timeframe label.
    #[arg(long, default_value = "1d")]
    timeframe: String,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV price file. Overrides the config file.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Use deterministic synthetic prices instead of a CSV file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Rules,
    Chat,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Analyze {
            source,
            backend,
            max_invocations,
            json,
        } => run_analyze(source, backend, max_invocations, json),
        Commands::Indicator { indicator } => match indicator {
            IndicatorCommand::MaCrossover {
                source,
                fast_ma,
                slow_ma,
            } => run_indicator(source, IndicatorRequest::MaCrossover { fast_ma, slow_ma }),
            IndicatorCommand::PriceCrossover { source, ma } => {
                run_indicator(source, IndicatorRequest::PriceCrossover { ma })
            }
        },
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(args: &SourceArgs) -> Result<ShastraConfig> {
    let mut config = match &args.config {
        Some(path) => ShastraConfig::from_file(path)?,
        None => ShastraConfig::default(),
    };
    if let Some(data) = &args.data {
        config.data.path = data.clone();
    }
    Ok(config)
}

fn price_source(args: &SourceArgs, config: &ShastraConfig) -> Result<Box<dyn PriceSource>> {
    if args.synthetic && args.data.is_some() {
        bail!("--synthetic and --data cannot be used together");
    }
    if args.synthetic {
        return Ok(Box::new(SyntheticSource::default()));
    }
    if !config.data.path.exists() {
        bail!(
            "price file {} not found (use --data or --synthetic)",
            config.data.path.display()
        );
    }
    Ok(Box::new(config.data.csv_source()))
}

fn run_analyze(
    args: SourceArgs,
    backend: Option<Backend>,
    max_invocations: Option<usize>,
    json: bool,
) -> Result<()> {
    let mut config = load_config(&args)?;

    match (backend, &config.decision) {
        (Some(Backend::Rules), DecisionConfig::ChatCompletions(_)) => {
            config.decision = DecisionConfig::Rules(RulesConfig::default());
        }
        (Some(Backend::Chat), DecisionConfig::Rules(_)) => {
            config.decision = DecisionConfig::ChatCompletions(ChatCompletionsConfig::default());
        }
        _ => {}
    }
    if let Some(limit) = max_invocations {
        config.pipeline.max_invocations = limit;
    }
    config.validate()?;

    let source = price_source(&args, &config)?;
    let decision_maker = config
        .decision
        .build()
        .context("cannot set up decision backend")?;
    info!(
        source = source.name(),
        backend = decision_maker.name(),
        max_invocations = config.pipeline.max_invocations,
        "starting analysis"
    );

    let request = RunRequest::new(&args.symbol, &args.timeframe);
    let report = match Pipeline::new(source.as_ref(), decision_maker.as_ref())
        .with_config(config.pipeline)
        .run(&request)
    {
        Ok(report) => report,
        Err(e) => {
            let stage = e.stage();
            return Err(anyhow::Error::new(e).context(format!("run failed during {stage}")));
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary());
    }
    Ok(())
}

fn run_indicator(args: SourceArgs, request: IndicatorRequest) -> Result<()> {
    let config = load_config(&args)?;
    let source = price_source(&args, &config)?;
    let series = source
        .read_price_data(&args.symbol, &args.timeframe)
        .with_context(|| format!("cannot load {} ({})", args.symbol, args.timeframe))?;

    let result = request.compute(&series.to_columns())?;
    info!(
        indicator = result.kind.key(),
        points = result.len(),
        defined = result.defined_count(),
        "indicator computed"
    );
    println!("{}", serde_json::to_string_pretty(&result.to_payload())?);
    Ok(())
}
