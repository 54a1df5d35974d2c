//! Termgrid Headless Runner
//!
//! Feeds a captured byte stream through a terminal and prints the
//! resulting screen. Useful for debugging escape sequences and producing
//! golden snapshots.

use std::io::{self, Read};
use std::process::ExitCode;

use termgrid::{Config, Terminal, TerminalEvent};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let opts = match Options::parse(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("termgrid-headless: {}", msg);
            eprintln!("try --help");
            return ExitCode::from(2);
        },
    };

    if opts.help {
        print_help();
        return ExitCode::SUCCESS;
    }

    let config = match &opts.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            },
        },
        None => Config::default(),
    };

    let input = match &opts.input {
        Some(path) => match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("cannot read {}: {}", path, e);
                return ExitCode::FAILURE;
            },
        },
        None => {
            let mut data = Vec::new();
            if let Err(e) = io::stdin().read_to_end(&mut data) {
                eprintln!("cannot read stdin: {}", e);
                return ExitCode::FAILURE;
            }
            data
        },
    };

    let mut terminal = Terminal::with_config(opts.rows, opts.cols, &config);
    match opts.chunk {
        Some(n) => input.chunks(n).for_each(|chunk| terminal.feed(chunk)),
        None => terminal.feed(&input),
    }
    tracing::debug!(bytes = input.len(), "fed input");

    match opts.format {
        OutputFormat::Text => {
            let snapshot = terminal.snapshot();
            println!(
                "{}x{} cursor={},{}",
                snapshot.cols, snapshot.rows, snapshot.cursor.row, snapshot.cursor.col
            );
            if !snapshot.title.is_empty() {
                println!("title={}", snapshot.title);
            }
            for event in terminal.take_events() {
                if let TerminalEvent::WorkingDirectoryChanged(dir) = event {
                    println!("cwd={}", dir);
                }
            }
            println!("---");
            for line in &snapshot.lines {
                println!("{}", line);
            }
            println!("---");
        },
        OutputFormat::Json => match terminal.snapshot().to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("cannot serialize snapshot: {}", e);
                return ExitCode::FAILURE;
            },
        },
    }

    ExitCode::SUCCESS
}

#[derive(Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

struct Options {
    rows: usize,
    cols: usize,
    chunk: Option<usize>,
    input: Option<String>,
    config: Option<String>,
    format: OutputFormat,
    help: bool,
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut opts = Options {
            rows: 24,
            cols: 80,
            chunk: None,
            input: None,
            config: None,
            format: OutputFormat::Text,
            help: false,
        };

        while let Some(arg) = args.next() {
            let mut value = |name: &str| args.next().ok_or_else(|| format!("{} needs a value", name));
            match arg.as_str() {
                "-c" | "--cols" => opts.cols = parse_count(&arg, &value(&arg)?)?,
                "-r" | "--rows" => opts.rows = parse_count(&arg, &value(&arg)?)?,
                "--chunk" => opts.chunk = Some(parse_count(&arg, &value(&arg)?)?),
                "-f" | "--file" => opts.input = Some(value(&arg)?),
                "--config" => opts.config = Some(value(&arg)?),
                "-j" | "--json" => opts.format = OutputFormat::Json,
                "-t" | "--text" => opts.format = OutputFormat::Text,
                "-h" | "--help" => opts.help = true,
                s if s.starts_with('-') => return Err(format!("unknown option {}", s)),
                _ if opts.input.is_none() => opts.input = Some(arg.clone()),
                _ => return Err(format!("unexpected argument {}", arg)),
            }
        }
        Ok(opts)
    }
}

fn parse_count(name: &str, raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("{} expects a positive number, got {:?}", name, raw)),
    }
}

fn print_help() {
    println!("termgrid-headless: replay a byte capture and print the screen");
    println!();
    println!("usage: termgrid-headless [OPTIONS] [INPUT_FILE]");
    println!();
    println!("  -c, --cols <N>       Set terminal width (default: 80)");
    println!("  -r, --rows <N>       Set terminal height (default: 24)");
    println!("  -f, --file <PATH>    Read input from file");
    println!("      --config <PATH>  Load a JSON config file");
    println!("      --chunk <N>      Feed input in N-byte chunks");
    println!("  -j, --json           Output snapshot as JSON");
    println!("  -t, --text           Output snapshot as text (default)");
    println!("  -h, --help           Show this help message");
    println!();
    println!("Reads stdin when no input file is given.");
    println!();
    println!("  printf 'Hello\\033[31mWorld\\033[0m' | termgrid-headless");
    println!("  termgrid-headless -c 120 -r 40 --chunk 7 input.txt");
    println!("  termgrid-headless --json < capture.bin > snapshot.json");
}
