// haaldus-p2g: Estonian spellings of pronunciations from stdin.
//
// Reads pronunciations from stdin (one per line, phones separated by
// spaces, e.g. `t sh a o s`) and prints the best spellings as
// `pronunciation<TAB>word<TAB>weight`. Same as `haaldus-g2p --inverse`.
//
// Usage:
//   haaldus-p2g [-d DATA_PATH] [--nbest N] [--fst MODEL] [--json] [PRONUNCIATION...]
//
// Options:
//   -d, --data-path PATH   Directory containing rewrites.txt, variants.txt, letters.map
//   --nbest N              Maximum number of spellings per pronunciation (default 3)
//   --fst MODEL            Language model for ranking spellings
//   --json                 Print one JSON object per hypothesis
//   -h, --help             Print help

use haaldus_core::Direction;

fn main() {
    haaldus_cli::setup_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (data_path, args) = haaldus_cli::parse_data_path(&args);

    if haaldus_cli::wants_help(&args) {
        println!("haaldus-p2g: Spellings of Estonian pronunciations.");
        println!();
        println!("Usage: haaldus-p2g [-d DATA_PATH] [--nbest N] [--fst MODEL] [--json] [PRONUNCIATION...]");
        println!();
        println!("If PRONUNCIATION arguments are given, converts each of them.");
        println!("Otherwise reads pronunciations from stdin (one per line).");
        println!();
        println!("Options:");
        println!("  -d, --data-path PATH   Directory containing rewrites.txt, variants.txt, letters.map");
        println!("  --nbest N              Maximum number of spellings per pronunciation (default 3)");
        println!("  --fst MODEL            Language model for ranking spellings");
        println!("  --json                 Print one JSON object per hypothesis");
        println!("  -h, --help             Print this help");
        return;
    }

    let options = haaldus_cli::parse_options(&args, Direction::PhonemeToGrapheme)
        .unwrap_or_else(|e| haaldus_cli::fatal(&e));
    let mut handle =
        haaldus_cli::load_handle(data_path.as_deref()).unwrap_or_else(|e| haaldus_cli::fatal(&e));

    haaldus_cli::run(&mut handle, &options);
}
