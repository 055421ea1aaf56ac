//! `nfa_grep` — a small grep-like CLI over the library's NFA matcher.
//!
//! Reads each named file (or stdin, if none are given) line by line and
//! prints the lines that match `pattern`. Exit code follows grep
//! convention: 0 if at least one line matched, 1 if none did, 2 on error
//! (bad pattern, unreadable file).

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use thompson_regex::Regex;

#[derive(Parser, Debug)]
#[command(name = "nfa_grep", about = "Search files for a byte-oriented regex pattern")]
struct Args {
    /// Pattern to search for (infix syntax: literals, [...], * + ? {n,m}, (), ^ $ \b).
    pattern: String,

    /// Files to search. Reads stdin if none are given.
    files: Vec<PathBuf>,

    /// Print each capture group's text alongside matching lines.
    #[arg(short = 'v', long = "captures")]
    show_captures: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut regex = match Regex::new(&args.pattern) {
        Ok(re) => re,
        Err(err) => {
            error!("invalid pattern: {}", err);
            eprintln!("nfa_grep: invalid pattern: {}", err);
            return ExitCode::from(1);
        }
    };

    let mut any_matched = false;
    let mut any_error = false;

    if args.files.is_empty() {
        let stdin = io::stdin();
        any_matched = search(stdin.lock(), "<stdin>", &mut regex, args.show_captures);
    } else {
        for path in &args.files {
            let file = match File::open(path) {
                Ok(f) => f,
                Err(err) => {
                    error!("failed to open {}: {}", path.display(), err);
                    eprintln!("nfa_grep: {}: {}", path.display(), err);
                    any_error = true;
                    continue;
                }
            };
            let label = path.display().to_string();
            if search(BufReader::new(file), &label, &mut regex, args.show_captures) {
                any_matched = true;
            }
        }
    }

    if any_error {
        ExitCode::from(2)
    } else if any_matched {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn search<R: BufRead>(reader: R, label: &str, regex: &mut Regex, show_captures: bool) -> bool {
    let mut matched_any = false;

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(err) => {
                error!("{}: read error: {}", label, err);
                continue;
            }
        };

        if regex.is_match(line.as_bytes()) {
            matched_any = true;
            println!("{}: {}", label, line);
            if show_captures {
                for i in 0..regex.capture_count() {
                    println!("  group {}: {}", i, String::from_utf8_lossy(regex.capture(i)));
                }
            }
        }
    }

    matched_any
}
