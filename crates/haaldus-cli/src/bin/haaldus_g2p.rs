// haaldus-g2p: Estonian pronunciations of words from stdin.
//
// Reads words from stdin (one per line) and prints the best pronunciations
// of each word as `word<TAB>pronunciation<TAB>weight`. Pronunciations are
// space-separated phones (š as sh, õ as ou, long plosives as kk pp tt).
// With --inverse it reads pronunciations and prints spellings instead.
//
// Usage:
//   haaldus-g2p [-d DATA_PATH] [--nbest N] [--inverse] [--fst MODEL] [--json] [WORD...]
//
// Options:
//   -d, --data-path PATH   Directory containing rewrites.txt, variants.txt, letters.map
//   --nbest N              Maximum number of hypotheses per word (default 3)
//   --inverse              Convert pronunciations to spellings
//   --fst MODEL            Language model for ranking spellings (with --inverse)
//   --json                 Print one JSON object per hypothesis
//   -h, --help             Print help

use haaldus_core::Direction;

fn main() {
    haaldus_cli::setup_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (data_path, args) = haaldus_cli::parse_data_path(&args);

    if haaldus_cli::wants_help(&args) {
        println!("haaldus-g2p: Pronunciations of Estonian words.");
        println!();
        println!("Usage: haaldus-g2p [-d DATA_PATH] [--nbest N] [--inverse] [--fst MODEL] [--json] [WORD...]");
        println!();
        println!("If WORD arguments are given, converts each word.");
        println!("Otherwise reads words from stdin (one per line).");
        println!();
        println!("Options:");
        println!("  -d, --data-path PATH   Directory containing rewrites.txt, variants.txt, letters.map");
        println!("  --nbest N              Maximum number of hypotheses per word (default 3)");
        println!("  --inverse              Convert pronunciations to spellings");
        println!("  --fst MODEL            Language model for ranking spellings (with --inverse)");
        println!("  --json                 Print one JSON object per hypothesis");
        println!("  -h, --help             Print this help");
        return;
    }

    let options = haaldus_cli::parse_options(&args, Direction::GraphemeToPhoneme)
        .unwrap_or_else(|e| haaldus_cli::fatal(&e));
    let mut handle =
        haaldus_cli::load_handle(data_path.as_deref()).unwrap_or_else(|e| haaldus_cli::fatal(&e));

    haaldus_cli::run(&mut handle, &options);
}
