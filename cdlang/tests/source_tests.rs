use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::{env, fs, io};
use walkdir::WalkDir;

fn main() {
    let args = libtest_mimic::Arguments::from_args();

    std::env::set_current_dir("..").unwrap();

    let tests = std::iter::empty()
        .chain(find_source_files("tests/succeed").map(|path| extract_test(path, 0)))
        .chain(find_source_files("tests/fail").map(|path| extract_test(path, 1)))
        .collect();

    libtest_mimic::run_tests(&args, tests, run_test).exit();
}

pub struct TestData {
    input_file: PathBuf,
    default_exit_code: i32,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "kebab-case")]
struct Config {
    #[serde(default = "DEFAULT_IGNORE")]
    ignore: bool,
    exit_code: Option<i32>,
    #[serde(default = "DEFAULT_COMMAND")]
    command: String,
    #[serde(default = "DEFAULT_STRINGS")]
    args: Vec<String>,
    #[serde(default = "DEFAULT_STRINGS")]
    stdout_contains: Vec<String>,
    #[serde(default = "DEFAULT_STRINGS")]
    stderr_contains: Vec<String>,
    #[serde(skip)]
    update_snapshots: bool,
}

const DEFAULT_IGNORE: fn() -> bool = || false;
const DEFAULT_COMMAND: fn() -> String = || "dom".to_owned();
const DEFAULT_STRINGS: fn() -> Vec<String> = || Vec::new();

struct TestFailure {
    name: &'static str,
    details: Vec<(&'static str, String)>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "kebab-case")]
struct SnapshotData {
    stdout: String,
    stderr: String,
}

#[derive(Debug)]
struct Snapshot {
    path: PathBuf,
    expected: Option<SnapshotData>,
    actual: SnapshotData,
}

#[derive(Eq, PartialEq, Debug)]
enum SnapshotOutcome {
    Equal,
    Different,
    Missing,
}

/// Recursively walk over test files under a file path.
pub fn find_source_files(root: impl AsRef<Path>) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| matches!(entry.path().extension(), Some(ext) if ext == "cdl"))
        .map(|entry| entry.into_path())
}

fn extract_test(path: PathBuf, default_exit_code: i32) -> libtest_mimic::Test<TestData> {
    libtest_mimic::Test {
        name: path.display().to_string(),
        kind: String::new(),
        is_ignored: false,
        is_bench: false,
        data: TestData {
            input_file: path,
            default_exit_code,
        },
    }
}

fn run_test(test: &libtest_mimic::Test<TestData>) -> libtest_mimic::Outcome {
    let mut failures = Vec::new();

    let config: Config = {
        use itertools::Itertools;

        const CONFIG_COMMENT_START: &str = "//~";

        let input_source = std::fs::read_to_string(&test.data.input_file).unwrap();
        // Collect the lines with CONFIG_COMMENT_START prefix, stripping the prefix in the process
        let config_source = input_source
            .lines()
            .filter_map(|line| line.split(CONFIG_COMMENT_START).nth(1))
            .join("\n");

        // Parse those lines as TOML
        match toml::from_str::<Config>(&config_source) {
            Ok(mut config) => {
                config.update_snapshots = env::var_os("CDLANG_UPDATE_SNAP").is_some();
                config
            }
            Err(error) => {
                failures.push(TestFailure {
                    name: "config parse error",
                    details: vec![("toml::de::Error", error.to_string())],
                });

                return failures_to_outcome(&failures);
            }
        }
    };

    if config.ignore {
        return libtest_mimic::Outcome::Ignored;
    }

    let exit_code = config.exit_code.unwrap_or(test.data.default_exit_code);
    match run_command(&config, exit_code, &test.data.input_file) {
        Ok(mut test_failures) => failures.append(&mut test_failures),
        Err(error) => {
            failures.push(TestFailure {
                name: "unexpected test command error",
                details: vec![("std::io::Error", error.to_string())],
            });
        }
    }

    failures_to_outcome(&failures)
}

fn failures_to_outcome(failures: &[TestFailure]) -> libtest_mimic::Outcome {
    if failures.is_empty() {
        libtest_mimic::Outcome::Passed
    } else {
        let mut msg = String::new();

        writeln!(msg).unwrap();
        for failure in failures {
            writeln!(msg, "    {}:", failure.name).unwrap();
            for (name, data) in &failure.details {
                writeln!(msg, "        ---- {} ----", name).unwrap();
                for line in data.lines() {
                    writeln!(msg, "        {}", line).unwrap();
                }
            }
            writeln!(msg).unwrap();
        }
        writeln!(msg).unwrap();
        writeln!(msg, "    failures:").unwrap();
        for failure in failures {
            writeln!(msg, "        {}", failure.name).unwrap();
        }

        libtest_mimic::Outcome::Failed { msg: Some(msg) }
    }
}

fn run_command(
    config: &Config,
    exit_code: i32,
    input_file: &Path,
) -> Result<Vec<TestFailure>, io::Error> {
    let mut failures = Vec::new();
    let mut exe = process::Command::new(env!("CARGO_BIN_EXE_cdlang"));
    exe.arg(&config.command).args(&config.args).arg(input_file);

    let output = match exe.output() {
        Ok(output) => output,
        Err(error) => {
            failures.push(TestFailure {
                name: "unexpected command error",
                details: vec![("std::io::Error", error.to_string())],
            });
            return Ok(failures);
        }
    };
    let mut snapshot = Snapshot::new(input_file, &output)?;

    // Snapshots are optional, but are written when updating is requested
    if config.update_snapshots && snapshot.outcome() != SnapshotOutcome::Equal {
        snapshot.update()?;
    }

    if snapshot.outcome() == SnapshotOutcome::Different {
        let mut details = vec![("path", snapshot.path.to_string_lossy().into_owned())];
        if let Some(diff) = snapshot.stdout_diff() {
            details.push(("stdout diff", diff));
        }
        if let Some(diff) = snapshot.stderr_diff() {
            details.push(("stderr diff", diff));
        }

        failures.push(TestFailure {
            name: "snapshot mismatch",
            details,
        });
    }

    let missing = |expected: &[String], actual: &str| {
        expected
            .iter()
            .filter(|text| !actual.contains(text.as_str()))
            .cloned()
            .collect::<Vec<_>>()
    };
    let missing_stdout = missing(&config.stdout_contains, snapshot.stdout());
    let missing_stderr = missing(&config.stderr_contains, snapshot.stderr());

    if output.status.code() != Some(exit_code)
        || !missing_stdout.is_empty()
        || !missing_stderr.is_empty()
    {
        let mut details = vec![("command", format!("{:?}", exe))];

        if output.status.code() != Some(exit_code) {
            details.push(("status", output.status.to_string()));
        }
        if !missing_stdout.is_empty() {
            details.push(("missing from stdout", missing_stdout.join("\n")));
        }
        if !missing_stderr.is_empty() {
            details.push(("missing from stderr", missing_stderr.join("\n")));
        }
        if !snapshot.stdout().is_empty() {
            details.push(("stdout", snapshot.stdout().to_string()));
        }
        if !snapshot.stderr().is_empty() {
            details.push(("stderr", snapshot.stderr().to_string()));
        }
        failures.push(TestFailure {
            name: "unexpected command output",
            details,
        });
    }

    Ok(failures)
}

impl Snapshot {
    fn new(test_path: &Path, output: &process::Output) -> Result<Snapshot, io::Error> {
        let path = test_path.with_extension("snap");
        let actual = SnapshotData {
            stdout: String::from_utf8_lossy(&output.stdout).into(),
            stderr: String::from_utf8_lossy(&output.stderr).into(),
        };
        let expected = match fs::read_to_string(&path) {
            Ok(snap) => toml::from_str(&snap)
                .map(Some)
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?,
            Err(err) => match err.kind() {
                io::ErrorKind::NotFound => None,
                _ => return Err(err),
            },
        };
        Ok(Snapshot {
            path,
            expected,
            actual,
        })
    }

    fn stdout(&self) -> &str {
        &self.actual.stdout
    }

    fn stderr(&self) -> &str {
        &self.actual.stderr
    }

    fn update(&mut self) -> Result<(), io::Error> {
        let serialised = toml::to_string_pretty(&self.actual)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        fs::write(&self.path, serialised)?;
        self.expected = Some(self.actual.clone());
        Ok(())
    }

    fn outcome(&self) -> SnapshotOutcome {
        match self.expected {
            Some(ref expected) => {
                if expected == &self.actual {
                    SnapshotOutcome::Equal
                } else {
                    SnapshotOutcome::Different
                }
            }
            None => SnapshotOutcome::Missing,
        }
    }

    fn stdout_diff(&self) -> Option<String> {
        self.expected
            .as_ref()
            .and_then(|expected| make_diff(&self.actual.stdout, &expected.stdout))
    }

    fn stderr_diff(&self) -> Option<String> {
        self.expected
            .as_ref()
            .and_then(|expected| make_diff(&self.actual.stderr, &expected.stderr))
    }
}

fn make_diff(actual: &str, expected: &str) -> Option<String> {
    let mut diff = String::new();
    let mut left_line_number = 0;
    let mut right_line_number = 0;
    let line_width = (actual.lines().count().max(expected.lines().count()) as f32)
        .log10()
        .ceil() as usize;
    for result in diff::lines(expected, actual).into_iter() {
        match result {
            diff::Result::Left(l) => {
                left_line_number += 1;
                diff.push_str(&diff_line('-', left_line_number, line_width, l));
            }
            diff::Result::Both(_l, _r) => {
                left_line_number += 1;
                right_line_number += 1;
            }
            diff::Result::Right(r) => {
                right_line_number += 1;
                diff.push_str(&diff_line('+', right_line_number, line_width, r));
            }
        }
    }
    if diff.is_empty() {
        None
    } else {
        Some(diff)
    }
}

fn diff_line(sign: char, line_number: usize, line_width: usize, line: &str) -> String {
    format!(
        "{:>width$}| {} {}\n",
        line_number,
        sign,
        line,
        width = line_width
    )
}
