mod check;
mod convert;
mod path_glob;
mod reconcile;
mod stats;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert translation files between formats.
    Convert {
        /// The input file to process
        #[arg(short, long)]
        input: String,

        /// The output file to write the results to
        #[arg(short, long)]
        output: String,

        /// Input format override when the extension is ambiguous
        #[arg(long)]
        input_format: Option<String>,

        /// Output format override when the extension is ambiguous
        #[arg(long)]
        output_format: Option<String>,

        /// Language code when the path conventions do not reveal it
        #[arg(short, long)]
        lang: Option<String>,

        /// Treat monolingual text as source strings instead of translations
        #[arg(long)]
        template: bool,
    },

    /// Parse translation files and report malformed input and warnings.
    Check {
        /// Files or glob patterns to check
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Fail on parse warnings, not only on errors
        #[arg(long)]
        strict: bool,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show translation statistics per file.
    Stats {
        /// Files or glob patterns to inspect
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Language code override applied to every file
        #[arg(short, long)]
        lang: Option<String>,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Align translation files with a template, msgmerge style.
    Reconcile {
        /// The template file holding the source of truth
        #[arg(short, long)]
        template: String,

        /// Translation files or glob patterns to update
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Drop stale units instead of keeping them as obsolete
        #[arg(long)]
        remove_obsolete: bool,

        /// Report changes without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions.
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let args = Args::parse();

    let result = match args.commands {
        Commands::Convert {
            input,
            output,
            input_format,
            output_format,
            lang,
            template,
        } => convert::run(convert::ConvertOptions {
            input,
            output,
            input_format,
            output_format,
            lang,
            template,
        }),
        Commands::Check {
            inputs,
            strict,
            json,
        } => check::run(&inputs, strict, json),
        Commands::Stats { inputs, lang, json } => stats::run(&inputs, &lang, json),
        Commands::Reconcile {
            template,
            inputs,
            remove_obsolete,
            dry_run,
            json,
        } => reconcile::run(reconcile::ReconcileArgs {
            template,
            inputs,
            remove_obsolete,
            dry_run,
            json,
        }),
        Commands::Completions { shell } => {
            let mut cmd = Args::command();
            clap_complete::generate(shell, &mut cmd, "langstore", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(message) = result {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}
