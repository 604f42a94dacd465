use clap::{Parser, Subcommand};

mod commands;

use commands::{ForecastArgs, StackArgs};

#[derive(Parser)]
#[command(name = "price-forecast")]
#[command(about = "Windowed price forecasting and stacked meta-models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a window regressor on merged sources and score the held-out tail
    Forecast(ForecastArgs),
    /// Blend upstream forecast results with a linear meta-model
    Stack(StackArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Forecast(args) => commands::run_forecast(&args),
        Commands::Stack(args) => commands::run_stack(&args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::MapePolicy;
    use std::path::PathBuf;

    #[test]
    fn forecast_flags_parse() {
        let cli = Cli::try_parse_from([
            "price-forecast",
            "forecast",
            "--config",
            "config/aapl.toml",
            "--window-size",
            "30",
            "--split-fraction",
            "0.75",
            "--mape-policy",
            "skip",
            "--metrics-json",
            "out/metrics.json",
        ])
        .unwrap();

        let Commands::Forecast(args) = cli.command else {
            panic!("expected forecast");
        };
        assert_eq!(args.config, PathBuf::from("config/aapl.toml"));
        assert_eq!(args.window_size, Some(30));
        assert_eq!(args.split_fraction, Some(0.75));
        assert_eq!(args.mape_policy, Some(MapePolicy::Skip));
        assert_eq!(args.metrics_json, Some(PathBuf::from("out/metrics.json")));
        assert!(args.output.is_none());
    }

    #[test]
    fn stack_defaults_to_workspace_config() {
        let cli = Cli::try_parse_from(["price-forecast", "stack", "--folds", "3"]).unwrap();

        let Commands::Stack(args) = cli.command else {
            panic!("expected stack");
        };
        assert_eq!(args.config, PathBuf::from("config/Config.toml"));
        assert_eq!(args.folds, Some(3));
        assert!(args.profile.is_none());
    }

    #[test]
    fn rejects_unknown_mape_policy() {
        let parsed = Cli::try_parse_from([
            "price-forecast",
            "forecast",
            "--mape-policy",
            "epsilon",
        ]);
        assert!(parsed.is_err());
    }
}
