use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use c2go::{build, split_records, transpile, TranspileOptions};

fn cli() -> Command {
    Command::new("c2go")
        .about("Transpile a clang AST dump into Go source")
        .arg(
            Arg::new("input")
                .help("AST dump produced by `clang -Xclang -ast-dump -fsyntax-only` ('-' for stdin)")
                .index(1),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Write the Go source to this file instead of stdout"),
        )
        .arg(
            Arg::new("package")
                .long("package")
                .help("Package name of the generated file"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("JSON file with transpile options"),
        )
        .arg(
            Arg::new("keep-system-decls")
                .long("keep-system-decls")
                .action(ArgAction::SetTrue)
                .help("Also translate declarations coming from system headers"),
        )
        .arg(
            Arg::new("dump-tree")
                .long("dump-tree")
                .action(ArgAction::SetTrue)
                .help("Print the reconstructed tree as JSON instead of Go source"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log every rendered and skipped declaration"),
        )
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Logs go to stderr so stdout stays valid Go
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
    {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn read_input(input: Option<&String>) -> Result<String> {
    match input.map(String::as_str) {
        None | Some("-") => {
            let mut dump = String::new();
            io::stdin()
                .read_to_string(&mut dump)
                .context("Failed to read AST dump from stdin")?;
            Ok(dump)
        }
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read AST dump {}", path)),
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    let mut options = match matches.get_one::<String>("config") {
        Some(path) => TranspileOptions::from_file(Path::new(path))?,
        None => TranspileOptions::default(),
    };
    if let Some(package) = matches.get_one::<String>("package") {
        options.package_name = package.clone();
    }
    if matches.get_flag("keep-system-decls") {
        options = options.keep_system_headers();
    }

    let input = matches.get_one::<String>("input");
    let source = input.map_or("stdin", String::as_str);
    let dump = read_input(input)?;

    let output = if matches.get_flag("dump-tree") {
        let records = split_records(&dump).with_context(|| format!("Failed to split {}", source))?;
        let root = build(&records).with_context(|| format!("Failed to build tree for {}", source))?;
        serde_json::to_string_pretty(&root).context("Failed to serialize tree")? + "\n"
    } else {
        transpile(&dump, &options).with_context(|| format!("Failed to transpile {}", source))?
    };

    match matches.get_one::<String>("output") {
        Some(path) => fs::write(path, output).with_context(|| format!("Failed to write {}", path))?,
        None => print!("{}", output),
    }

    Ok(())
}
