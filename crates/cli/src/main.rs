mod config;
mod output;
mod type_expr;

use std::path::PathBuf;

use clap::Parser;
use miette::{IntoDiagnostic, WrapErr};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Catalog file declaring the types and the pattern list
    #[arg(short, long)]
    catalog: PathBuf,

    /// Print every resolved value instead of only the first
    #[arg(short, long)]
    all: bool,

    /// Report the candidates and the number of values on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Candidate types, e.g. `int` or `List<string[]>`
    candidates: Vec<String>,
}

fn main() -> miette::Result<()> {
    let args = Cli::parse();

    let contents = std::fs::read_to_string(&args.catalog)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", args.catalog.display()))?;
    let resolver = config::load_config(&contents)?.resolver()?;

    let candidates = args
        .candidates
        .iter()
        .map(|src| type_expr::closed_type(resolver.catalog(), src))
        .collect::<Result<Vec<_>, _>>()?;

    if args.verbose {
        let names: Vec<String> = candidates
            .iter()
            .map(|ty| resolver.catalog().display(ty).to_string())
            .collect();
        eprintln!("candidates: [{}]", names.join(", "));
    }

    let values = if args.all {
        resolver.resolve_all(&candidates).into_diagnostic()?
    } else {
        resolver
            .resolve_first(&candidates)
            .into_diagnostic()?
            .into_iter()
            .collect()
    };

    for value in &values {
        println!("{}", value.display(resolver.catalog()));
    }

    if args.verbose {
        eprintln!("resolved {} value(s)", values.len());
    }

    if values.is_empty() {
        eprintln!("no pattern matched");
        std::process::exit(1);
    }

    Ok(())
}
