use std::env;
use std::fs;
use std::io::{self, IsTerminal};
use std::process;
use std::thread;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use yali_core::error::ERROR_TAG;
use yali_core::options::EvalOptions;
use yali_core::{print, print_colored};
use yali_lang::{create_interpreter, repl};

const MAIN_STACK_BYTES: usize = 64 * 1024 * 1024;

const USAGE: &str = "Usage: yali [-e CODE] [file] [--repl] [--no-prelude] [--max-depth N] \
                     [--no-macro-cache] [--no-dot] [-v|-vv|-q]";

fn help() -> ! {
    println!("{}", USAGE);
    println!();
    println!("Options:");
    println!("  -e CODE           Evaluate CODE, print the result and exit");
    println!("  --repl            Start the REPL, or enter it after running a script");
    println!("  --no-prelude      Do not load the prelude definitions");
    println!("  --max-depth N     Evaluation nesting limit before stack exhaustion");
    println!("  --no-macro-cache  Re-run macros on every expansion");
    println!("  --no-dot          Read a.b.c as a plain symbol");
    println!("  -v, -vv           Log debug / trace events to stderr");
    println!("  -q                Only log errors");
    println!("  --version         Show version");
    println!("  -h, --help        Show this help");
    println!();
    println!("YALI_LOG overrides the log filter, e.g. YALI_LOG=yali_core=debug.");
    process::exit(0);
}

fn usage_error(message: &str) -> ! {
    eprintln!("{} {}", ERROR_TAG, message);
    eprintln!("{}", USAGE);
    process::exit(2);
}

struct Cli {
    source: Option<String>,
    file: Option<String>,
    repl: bool,
    prelude: bool,
    verbose: u8,
    quiet: bool,
    options: EvalOptions,
}

fn parse_args(mut args: Vec<String>) -> Cli {
    let mut cli = Cli {
        source: None,
        file: None,
        repl: false,
        prelude: true,
        verbose: 0,
        quiet: false,
        options: EvalOptions::default(),
    };
    while !args.is_empty() {
        match args[0].as_str() {
            "-e" => {
                if args.len() < 2 {
                    usage_error("-e requires code to evaluate");
                }
                cli.source = Some(args[1].clone());
                args.drain(0..2);
            }
            "--max-depth" => {
                let depth = args.get(1).and_then(|raw| raw.parse::<usize>().ok());
                match depth {
                    Some(depth) if depth > 0 => cli.options.max_depth = depth,
                    _ => usage_error("--max-depth requires a positive integer"),
                }
                args.drain(0..2);
            }
            "--repl" => {
                cli.repl = true;
                args.remove(0);
            }
            "--no-prelude" => {
                cli.prelude = false;
                args.remove(0);
            }
            "--no-macro-cache" => {
                cli.options.macro_cache = false;
                args.remove(0);
            }
            "--no-dot" => {
                cli.options.dot_access = false;
                args.remove(0);
            }
            "-v" => {
                cli.verbose = cli.verbose.max(1);
                args.remove(0);
            }
            "-vv" => {
                cli.verbose = 2;
                args.remove(0);
            }
            "-q" => {
                cli.quiet = true;
                args.remove(0);
            }
            "--version" => {
                println!("yali {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            "-h" | "--help" => help(),
            s if s.starts_with('-') => usage_error(&format!("unknown option: {}", s)),
            _ => {
                if cli.file.is_some() {
                    usage_error(&format!("unexpected argument: {}", args[0]));
                }
                cli.file = Some(args.remove(0));
            }
        }
    }
    cli
}

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = match env::var("YALI_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ if quiet => EnvFilter::new("error"),
        _ => EnvFilter::new(match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }),
    };
    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true)
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(formatter)
        .with(filter)
        .init();
}

fn run() -> i32 {
    let cli = parse_args(env::args().skip(1).collect());
    setup_logging(cli.verbose, cli.quiet);

    let mut options = cli.options;
    let code = match (&cli.source, &cli.file) {
        (Some(source), _) => {
            options.source_name = Some("<cmdline>".into());
            Some(source.clone())
        }
        (None, Some(file)) => {
            options.source_name = Some(file.clone());
            match fs::read_to_string(file) {
                Ok(code) => Some(code),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    eprintln!("{} File not found: {}", ERROR_TAG, file);
                    return 1;
                }
                Err(e) => {
                    eprintln!("{} Failed to read {}: {}", ERROR_TAG, file, e);
                    return 1;
                }
            }
        }
        (None, None) => None,
    };

    let interp = match create_interpreter(options, cli.prelude) {
        Ok(interp) => interp,
        Err(err) => {
            repl::print_error(&err);
            return 1;
        }
    };

    let Some(code) = code else {
        repl::interactive_repl(&interp);
        return 0;
    };
    match interp.eval_str(&code) {
        Ok(value) => {
            if cli.source.is_some() {
                if io::stdout().is_terminal() {
                    println!("{}", print_colored(&value));
                } else {
                    println!("{}", print(&value));
                }
            }
        }
        Err(err) => {
            repl::print_error(&err);
            if !cli.repl {
                return 1;
            }
        }
    }
    if cli.repl {
        repl::interactive_repl(&interp);
    }
    0
}

fn main() {
    let worker = thread::Builder::new()
        .name("yali-main".into())
        .stack_size(MAIN_STACK_BYTES)
        .spawn(run);
    let code = match worker {
        Ok(handle) => handle.join().unwrap_or(101),
        Err(err) => {
            eprintln!("{} failed to start interpreter thread: {}", ERROR_TAG, err);
            1
        }
    };
    process::exit(code);
}
