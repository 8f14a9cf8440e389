//! Quill CLI - run feature modules against sandboxed configuration

use clap::Parser;
use quill::cli::{Args, SubCommand};
use quill::host::fs::current_working_directory;
use quill::output::{format_output, CheckReport, FeatureSummary, OutputFormat, Report};
use quill::{Dispatcher, Settings};

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> quill::Result<i32> {
    let cwd = current_working_directory()?;
    let mut settings = Settings::load(args.settings.as_deref(), &cwd)?;
    if let Some(dir) = args.lib_dir {
        settings.features.dir = dir;
    }
    if let Some(dir) = args.config_dir {
        settings.config.dir = dir;
    }
    let settings = settings.resolved(&cwd);

    let output_format = if args.json { OutputFormat::Json } else { OutputFormat::Human };
    let dispatcher = Dispatcher::new(settings)?;

    match args.command {
        SubCommand::Run { feature, args: feature_args } => {
            dispatcher.run(&feature, &feature_args)
        }

        SubCommand::List => {
            let names = dispatcher.list_discoverable_features()?;
            println!("{}", format_output(&Report::Features(names), &output_format));
            Ok(0)
        }

        SubCommand::Check => {
            dispatcher.load_all_features()?;
            let reload = dispatcher.reload()?;
            let report = CheckReport {
                features: dispatcher
                    .loaded_features()
                    .iter()
                    .map(FeatureSummary::from)
                    .collect(),
                providers: dispatcher.registry().names(),
                reload,
                bindings: dispatcher
                    .configuration()
                    .map(|config| config.bindings())
                    .unwrap_or_default(),
            };
            println!("{}", format_output(&Report::Check(report), &output_format));
            Ok(0)
        }
    }
}
