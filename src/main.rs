use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cairn::comments::{DEFAULT_DIRECTIVE_PREFIX, DirectiveFilter};
use cairn::error::Error;
use cairn::pipeline::{Options, instrument_to};
use cairn::rewrite::ProbeConfig;

#[derive(Parser)]
#[command(
    name = "cairn",
    about = "Inject entry/exit probes into every function of a Rust source file",
    version
)]
struct Cli {
    /// Source file to instrument.
    file: PathBuf,

    /// Write the instrumented source here instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Function called on entry to every instrumented body.
    #[arg(long, value_name = "PATH", default_value = "on_enter")]
    enter_fn: String,

    /// Function called on exit from every instrumented body.
    #[arg(long, value_name = "PATH", default_value = "on_exit")]
    exit_fn: String,

    /// Comment prefix kept through the rewrite when it starts at column 1
    /// (repeatable).
    #[arg(long = "directive", value_name = "PREFIX", default_value = DEFAULT_DIRECTIVE_PREFIX)]
    directives: Vec<String>,

    /// Do not instrument `const fn` bodies.
    #[arg(long)]
    skip_const: bool,
}

fn main() {
    // stdout carries the rewritten source, so logs go to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let source = std::fs::read_to_string(&cli.file).map_err(|source| Error::ReadInput {
        path: cli.file.clone(),
        source,
    })?;

    let options = Options {
        probes: ProbeConfig {
            enter_fn: cli.enter_fn,
            exit_fn: cli.exit_fn,
            skip_const: cli.skip_const,
        },
        directives: DirectiveFilter::new(cli.directives),
    };

    let name = cli.file.display().to_string();
    let blocks = match cli.output {
        Some(path) => {
            // Render fully before touching the output file.
            let mut buffer = Vec::new();
            let blocks = instrument_to(&mut buffer, &name, &source, &options)?;
            std::fs::write(&path, buffer)?;
            blocks
        }
        None => instrument_to(&mut std::io::stdout().lock(), &name, &source, &options)?,
    };
    tracing::info!(file = %name, functions = blocks.len(), "instrumented");

    Ok(())
}
