use anyhow::{bail, Context, Result};
use kestrel_motion::clip_validation::{ClipValidationEvent, ClipValidationSeverity, ClipValidator};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

const CLIP_EXTENSIONS: [&str; 3] = ["json", "gltf", "glb"];

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(tally) if tally.failed => process::exit(2),
        Ok(_) => {}
        Err(err) => {
            eprintln!("clip_check error: {err:?}");
            process::exit(1);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Text,
    Json,
}

#[derive(Debug)]
struct Options {
    strict: bool,
    output: Output,
    help: bool,
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Default, Serialize)]
struct Tally {
    checked: usize,
    warnings: usize,
    errors: usize,
    #[serde(skip)]
    failed: bool,
}

impl Tally {
    fn record(&mut self, severity: ClipValidationSeverity) {
        match severity {
            ClipValidationSeverity::Warning => self.warnings += 1,
            ClipValidationSeverity::Error => self.errors += 1,
            ClipValidationSeverity::Info => {}
        }
    }

    fn finish(mut self, strict: bool) -> Self {
        self.failed = self.errors > 0 || (strict && self.warnings > 0);
        self
    }
}

fn run(args: &[String]) -> Result<Tally> {
    let options = parse_options(args)?;
    if options.help {
        print_usage();
        return Ok(Tally::default());
    }
    if options.inputs.is_empty() {
        bail!("no clip files given; see --help");
    }
    let targets = gather_clip_files(&options.inputs)?;
    if targets.is_empty() {
        bail!("no clip files found under the given paths");
    }

    let validator = ClipValidator::new();
    let mut tally = Tally::default();
    for path in &targets {
        tally.checked += 1;
        for event in validator.validate_path(path) {
            tally.record(event.severity);
            print_event(&event, options.output);
        }
    }
    match options.output {
        Output::Text => println!(
            "{} clip file(s): {} warning(s), {} error(s)",
            tally.checked, tally.warnings, tally.errors
        ),
        Output::Json => println!("{}", json!({ "summary": &tally })),
    }
    Ok(tally.finish(options.strict))
}

fn parse_options(args: &[String]) -> Result<Options> {
    let mut options = Options { strict: false, output: Output::Text, help: false, inputs: Vec::new() };
    for arg in args {
        match arg.as_str() {
            "--fail-on-warn" => options.strict = true,
            "--report-stats" => options.output = Output::Json,
            "--help" | "-h" => options.help = true,
            flag if flag.starts_with("--") => bail!("unknown flag '{flag}'"),
            path => options.inputs.push(PathBuf::from(path)),
        }
    }
    Ok(options)
}

/// Expand files and directories into a sorted, de-duplicated list of clip files.
fn gather_clip_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut found = BTreeSet::new();
    let mut pending: Vec<PathBuf> = Vec::new();
    for input in inputs {
        if input.is_file() {
            if has_clip_extension(input) {
                found.insert(input.clone());
            } else {
                log::warn!(target: "motion::clips", "skipping '{}': not a clip file", input.display());
            }
        } else if input.is_dir() {
            pending.push(input.clone());
        } else {
            bail!("path '{}' does not exist", input.display());
        }
    }
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).with_context(|| format!("failed to list '{}'", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if has_clip_extension(&path) {
                found.insert(path);
            }
        }
    }
    Ok(found.into_iter().collect())
}

fn has_clip_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| CLIP_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

fn print_event(event: &ClipValidationEvent, output: Output) {
    match output {
        Output::Text => println!("{:<7} {}: {}", format!("[{}]", event.severity), event.path.display(), event.message),
        Output::Json => println!(
            "{}",
            json!({
                "severity": event.severity.to_string(),
                "path": event.path.display().to_string(),
                "message": event.message,
            })
        ),
    }
}

fn print_usage() {
    eprintln!(
        "Clip Check

Usage:
  clip_check [--fail-on-warn] [--report-stats] <path> [<path>...]

Validates JSON and glTF animation clips. Directories are searched recursively.
Tracks that do not map onto a humanoid bone are reported as warnings, and
--fail-on-warn makes warnings fail the run (exit code 2). --report-stats prints
one JSON object per finding followed by a summary object.
"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn flags_and_paths_are_separated() {
        let options = parse_options(&args(&["--fail-on-warn", "clips", "--report-stats", "wave.json"])).expect("options");
        assert!(options.strict);
        assert_eq!(options.output, Output::Json);
        assert_eq!(options.inputs, vec![PathBuf::from("clips"), PathBuf::from("wave.json")]);
        assert!(parse_options(&args(&["--fail-fast"])).is_err());
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(has_clip_extension(Path::new("clips/wave.JSON")));
        assert!(has_clip_extension(Path::new("clips/idle.glb")));
        assert!(!has_clip_extension(Path::new("clips/notes.txt")));
        assert!(!has_clip_extension(Path::new("clips/json")));
    }

    #[test]
    fn strict_mode_fails_on_warnings() {
        let mut tally = Tally::default();
        tally.record(ClipValidationSeverity::Warning);
        tally.record(ClipValidationSeverity::Info);
        assert!(!Tally { warnings: tally.warnings, ..Default::default() }.finish(false).failed);
        assert!(tally.finish(true).failed);
    }

    #[test]
    fn fixture_directory_is_gathered_in_order() {
        let files = gather_clip_files(&[PathBuf::from("fixtures/clips")]).expect("gather");
        assert!(files.len() >= 4);
        assert!(files.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
