// haaldus-cli: shared utilities for CLI tools.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use haaldus_core::{Direction, Hypothesis};
use haaldus_et::handle::Haaldus;
use haaldus_et::notation::{encode_pronunciation, render_pronunciation};
use haaldus_et::tables::REWRITES_FILE;
use haaldus_fst::LanguageModel;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Environment variable naming a rule table directory.
const DATA_PATH_ENV: &str = "HAALDUS_DATA_PATH";

/// Environment variable holding the log filter.
const LOG_ENV: &str = "HAALDUS_LOG";

/// Install the stderr log subscriber. The filter comes from `HAALDUS_LOG`
/// and defaults to `warn`.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Search for rule tables and build a Haaldus handle.
///
/// Search order:
/// 1. `data_path` argument (if provided)
/// 2. `HAALDUS_DATA_PATH` environment variable
/// 3. `~/.haaldus`
/// 4. `/usr/share/haaldus`
/// 5. The tables bundled into the binary
pub fn load_handle(data_path: Option<&str>) -> Result<Haaldus, String> {
    if let Some(p) = data_path {
        let dir = PathBuf::from(p);
        if !dir.join(REWRITES_FILE).is_file() {
            return Err(format!("{} not found in {}", REWRITES_FILE, dir.display()));
        }
        return from_dir(&dir);
    }

    for dir in build_search_paths() {
        if dir.join(REWRITES_FILE).is_file() {
            return from_dir(&dir);
        }
    }

    info!("using bundled rule tables");
    Haaldus::bundled().map_err(|e| format!("failed to build bundled cascade: {e}"))
}

fn from_dir(dir: &Path) -> Result<Haaldus, String> {
    info!(dir = %dir.display(), "loading rule tables");
    Haaldus::from_dir(dir).map_err(|e| format!("failed to build cascade from {}: {e}", dir.display()))
}

/// Build the list of directories to search for rule tables.
fn build_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. HAALDUS_DATA_PATH environment variable
    if let Ok(env_path) = std::env::var(DATA_PATH_ENV) {
        paths.push(PathBuf::from(env_path));
    }

    // 2. Home directory
    if let Some(home) = home_dir() {
        paths.push(home.join(".haaldus"));
    }

    // 3. System path
    paths.push(PathBuf::from("/usr/share/haaldus"));

    paths
}

/// Get the user's home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

/// Parse a `--data-path=PATH` or `-d PATH` argument from command line args.
///
/// Returns `(data_path, remaining_args)`.
pub fn parse_data_path(args: &[String]) -> (Option<String>, Vec<String>) {
    let mut data_path = None;
    let mut remaining = Vec::new();
    let mut skip_next = false;

    for (i, arg) in args.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if let Some(val) = arg.strip_prefix("--data-path=") {
            data_path = Some(val.to_string());
        } else if arg == "--data-path" || arg == "-d" {
            if i + 1 < args.len() {
                data_path = Some(args[i + 1].clone());
                skip_next = true;
            } else {
                fatal(&format!("{arg} requires a value"));
            }
        } else {
            remaining.push(arg.clone());
        }
    }

    (data_path, remaining)
}

/// Conversion options shared by the binaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub direction: Direction,
    pub n_best: usize,
    /// Binary language model file used to rescore P2G output.
    pub model: Option<PathBuf>,
    pub json: bool,
    /// Words (or pronunciations) given on the command line.
    pub inputs: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            direction: Direction::GraphemeToPhoneme,
            n_best: 3,
            model: None,
            json: false,
            inputs: Vec::new(),
        }
    }
}

/// Parse `--nbest N`, `--inverse`, `--fst MODEL` and `--json`. Other
/// arguments are inputs; unknown flags are an error.
pub fn parse_options(args: &[String], direction: Direction) -> Result<Options, String> {
    let mut options = Options {
        direction,
        ..Options::default()
    };
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            inline
                .clone()
                .or_else(|| iter.next().cloned())
                .ok_or_else(|| format!("{name} requires a value"))
        };
        match flag {
            "--nbest" => {
                let raw = value("--nbest")?;
                options.n_best = raw
                    .parse()
                    .map_err(|_| format!("--nbest expects a number, got {raw:?}"))?;
            }
            "--fst" => options.model = Some(PathBuf::from(value("--fst")?)),
            "--inverse" => options.direction = Direction::PhonemeToGrapheme,
            "--json" => options.json = true,
            _ if flag.starts_with('-') && flag.len() > 1 => return Err(format!("unknown option {arg}")),
            _ => options.inputs.push(arg.clone()),
        }
    }

    if options.model.is_some() && options.direction == Direction::GraphemeToPhoneme {
        return Err("--fst only applies with --inverse".to_string());
    }
    Ok(options)
}

/// Convert every input (from the command line, or stdin one per line) and
/// print the hypotheses.
pub fn run(handle: &mut Haaldus, options: &Options) {
    handle.set_n_best(options.n_best);
    let model = options.model.as_deref().map(|path| {
        handle
            .load_language_model(path)
            .unwrap_or_else(|e| fatal(&format!("failed to load language model: {e}")))
    });

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    if options.inputs.is_empty() {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("error reading stdin: {e}");
                    break;
                }
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            convert(handle, options, model.as_ref(), input, &mut out);
            // Interactive use: one answer per line as soon as it is ready.
            let _ = out.flush();
        }
    } else {
        for input in &options.inputs {
            convert(handle, options, model.as_ref(), input, &mut out);
        }
    }
}

fn convert(
    handle: &Haaldus,
    options: &Options,
    model: Option<&LanguageModel>,
    input: &str,
    out: &mut impl Write,
) {
    let (source, result) = match options.direction {
        Direction::GraphemeToPhoneme => (input.to_string(), handle.g2p(input)),
        Direction::PhonemeToGrapheme => {
            let pron = encode_pronunciation(input);
            let result = handle.p2g(&pron, model);
            (render_pronunciation(&pron), result)
        }
    };

    let hypotheses = match result {
        Ok(h) => h,
        Err(e) => {
            eprintln!("{input}: {e}");
            return;
        }
    };
    if hypotheses.is_empty() {
        eprintln!("{input}: no result");
        return;
    }

    for hypothesis in hypotheses {
        let shown = match options.direction {
            Direction::GraphemeToPhoneme => {
                Hypothesis::new(render_pronunciation(&hypothesis.text), hypothesis.weight)
            }
            Direction::PhonemeToGrapheme => hypothesis,
        };
        if options.json {
            let _ = writeln!(out, "{}", json_line(&source, &shown));
        } else {
            let _ = writeln!(out, "{source}\t{}\t{}", shown.text, shown.weight);
        }
    }
}

/// One JSON object: the input plus the serialized hypothesis.
fn json_line(input: &str, hypothesis: &Hypothesis) -> String {
    let mut value = serde_json::to_value(hypothesis).unwrap_or(serde_json::Value::Null);
    if let Some(object) = value.as_object_mut() {
        object.insert("input".to_string(), serde_json::Value::String(input.to_string()));
    }
    value.to_string()
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

/// Check if `--help` or `-h` is in the args.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}
