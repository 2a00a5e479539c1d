use cdlang::dom::{Dom, Version};
use cdlang::pass::Options;
use cdlang::{Driver, Format, Status};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Compile contract-testing scenarios for gNMI and control streams
#[derive(Parser)]
#[clap(author, version, about)]
enum Cli {
    /// Compile a scenario file, printing the resolved DOM to stdout
    Dom {
        #[clap(flatten)]
        input: Input,
        /// Output format
        #[clap(long = "format", value_name = "pretty|json", default_value = "pretty")]
        format: Format,
    },
    /// Compile a scenario file, reporting errors only
    Check {
        #[clap(flatten)]
        input: Input,
    },
    /// Compile a scenario file, printing which scenarios cover each gNMI path
    #[clap(after_help = COVERAGE_COMMAND_AFTER_HELP)]
    Coverage {
        #[clap(flatten)]
        input: Input,
        /// Output format
        #[clap(long = "format", value_name = "pretty|json", default_value = "pretty")]
        format: Format,
    },
}

const COVERAGE_COMMAND_AFTER_HELP: &str = "\
Examples:

  $ cdlang coverage scenarios/subscribe.cdl
  $ cdlang coverage --target-version 1.2.0 --format json scenarios/subscribe.cdl
";

#[derive(clap::Args)]
struct Input {
    /// Path to a scenario file, or `-` to read from stdin
    #[clap(value_name = "FILE")]
    file: PathOrStdin,
    /// Newest scenario version to compile
    #[clap(long = "target-version", value_name = "VERSION", default_value = "latest")]
    target_version: Version,
    /// Continue even if errors were encountered
    #[clap(long = "allow-errors")]
    allow_errors: bool,
    /// Log more detail, can be repeated
    #[clap(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Debug)]
enum PathOrStdin {
    StdIn,
    Path(PathBuf),
}

impl std::str::FromStr for PathOrStdin {
    type Err = std::convert::Infallible;

    fn from_str(src: &str) -> Result<PathOrStdin, std::convert::Infallible> {
        match src {
            "-" => Ok(PathOrStdin::StdIn),
            _ => Ok(PathOrStdin::Path(PathBuf::from(src))),
        }
    }
}

fn unwrap_or_exit<T>(option: Option<T>) -> T {
    option.unwrap_or_else(|| std::process::exit(Status::Error.exit_code()))
}

fn load_file_or_exit(driver: &mut Driver, file: PathOrStdin) -> cdlang::files::FileId {
    unwrap_or_exit(match file {
        PathOrStdin::StdIn => driver.load_source("<stdin>".to_owned(), std::io::stdin()),
        PathOrStdin::Path(path) => driver.load_source_path(&path),
    })
}

const MAX_PRETTY_WIDTH: usize = 80;

fn get_pretty_width() -> usize {
    let term_width = termsize::get().map_or(usize::MAX, |size| usize::from(size.cols));
    std::cmp::min(term_width, MAX_PRETTY_WIDTH)
}

/// Log to stderr, filtered by `CDLANG_LOG` if it is set.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_env("CDLANG_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn compile_or_exit(input: Input) -> (Driver, Dom) {
    init_logging(input.verbose);

    let mut driver = Driver::new();
    driver.install_panic_hook();
    driver.set_allow_errors(input.allow_errors);
    driver.set_emit_width(get_pretty_width());

    let file_id = load_file_or_exit(&mut driver, input.file);
    let options = Options {
        target_version: input.target_version,
        trace_passes: input.verbose > 0,
    };
    let dom = unwrap_or_exit(driver.build_dom(file_id, &options));

    (driver, dom)
}

fn main() -> ! {
    let driver = match Cli::parse() {
        Cli::Dom { input, format } => {
            let (driver, dom) = compile_or_exit(input);
            driver.emit_dom(&dom, format);
            driver
        }
        Cli::Check { input } => compile_or_exit(input).0,
        Cli::Coverage { input, format } => {
            let (driver, dom) = compile_or_exit(input);
            driver.emit_coverage(&dom, format);
            driver
        }
    };

    std::process::exit(driver.status().exit_code());
}
