// Rule table loading: lexical rewrites, word variants, letter names.
//
// All tables are UTF-8 text with whitespace-separated fields. Blank lines and
// lines starting with `#` are skipped.

use std::fs;
use std::path::Path;

use haaldus_core::character::input_chars;
use hashbrown::HashMap;

use crate::HaaldusError;

pub const REWRITES_FILE: &str = "rewrites.txt";
pub const VARIANTS_FILE: &str = "variants.txt";
pub const LETTERS_FILE: &str = "letters.map";

const BUNDLED_REWRITES: &str = include_str!("../conf/rewrites.txt");
const BUNDLED_VARIANTS: &str = include_str!("../conf/variants.txt");
const BUNDLED_LETTERS: &str = include_str!("../conf/letters.map");

/// A lexical rewrite entry: a word and every pronunciation it may be
/// rewritten to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteEntry {
    pub word: String,
    pub alternatives: Vec<String>,
}

/// The parsed rule tables a cascade is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTables {
    /// Lexical rewrites, longest word first.
    pub rewrites: Vec<RewriteEntry>,
    /// Whole-word orthographic variants, in file order.
    pub variants: Vec<(String, String)>,
    /// Letter, digit and punctuation names for spelling out.
    pub letters: Vec<(String, String)>,
}

impl RuleTables {
    /// The tables shipped with the crate.
    pub fn bundled() -> Result<Self, HaaldusError> {
        Self::parse(BUNDLED_REWRITES, BUNDLED_VARIANTS, BUNDLED_LETTERS)
    }

    /// Load `rewrites.txt`, `variants.txt` and `letters.map` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, HaaldusError> {
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read_to_string(&path).map_err(|source| HaaldusError::Io { path, source })
        };
        let rewrites = read(REWRITES_FILE)?;
        let variants = read(VARIANTS_FILE)?;
        let letters = read(LETTERS_FILE)?;
        Self::parse(&rewrites, &variants, &letters)
    }

    /// Parse the three tables from their text.
    pub fn parse(rewrites: &str, variants: &str, letters: &str) -> Result<Self, HaaldusError> {
        Ok(Self {
            rewrites: parse_rewrites(rewrites, REWRITES_FILE)?,
            variants: parse_pairs(variants, VARIANTS_FILE)?,
            letters: parse_pairs(letters, LETTERS_FILE)?,
        })
    }
}

/// Parse a lexical rewrite table: `word rewrite1 [rewrite2 ...]`.
///
/// Rows with a single field are skipped. A word listed on several rows keeps
/// the alternatives of all of them. The result is ordered by descending word
/// length (in characters), ties in first-appearance order.
pub fn parse_rewrites(text: &str, file: &str) -> Result<Vec<RewriteEntry>, HaaldusError> {
    let alphabet = input_chars();
    let mut entries: Vec<RewriteEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (line, fields) in rows(text) {
        if fields.len() < 2 {
            continue;
        }
        for field in &fields {
            check_field(field, &alphabet, file, line)?;
        }
        let word = fields[0];
        let alternatives = fields[1..].iter().map(|s| s.to_string());
        match index.get(word) {
            Some(&i) => {
                let entry = &mut entries[i];
                for alt in alternatives {
                    if !entry.alternatives.contains(&alt) {
                        entry.alternatives.push(alt);
                    }
                }
            }
            None => {
                index.insert(word.to_string(), entries.len());
                entries.push(RewriteEntry {
                    word: word.to_string(),
                    alternatives: alternatives.collect(),
                });
            }
        }
    }

    // Stable: equal lengths keep file order.
    entries.sort_by_key(|e| std::cmp::Reverse(e.word.chars().count()));
    Ok(entries)
}

/// Parse a `from to` pair table. Rows with fewer than 2 fields are skipped;
/// rows with more are malformed.
pub fn parse_pairs(text: &str, file: &str) -> Result<Vec<(String, String)>, HaaldusError> {
    let alphabet = input_chars();
    let mut pairs = Vec::new();

    for (line, fields) in rows(text) {
        match fields.len() {
            0 | 1 => continue,
            2 => {}
            n => {
                return Err(HaaldusError::ConfigParse {
                    file: file.to_string(),
                    line,
                    reason: format!("expected 2 fields, found {n}"),
                });
            }
        }
        check_field(fields[0], &alphabet, file, line)?;
        check_field(fields[1], &alphabet, file, line)?;
        pairs.push((fields[0].to_string(), fields[1].to_string()));
    }

    Ok(pairs)
}

/// Non-comment lines split into fields, with 1-based line numbers.
fn rows(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines().enumerate().filter_map(|(i, line)| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        Some((i + 1, line.split_whitespace().collect()))
    })
}

fn check_field(field: &str, alphabet: &[char], file: &str, line: usize) -> Result<(), HaaldusError> {
    match field.chars().find(|c| !alphabet.contains(c)) {
        Some(c) => Err(HaaldusError::ConfigParse {
            file: file.to_string(),
            line,
            reason: format!("character {c:?} in {field:?} is outside the input alphabet"),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_longest_first() {
        let entries = parse_rewrites("ma mina\nselle sele\nsellest selest\n", REWRITES_FILE).unwrap();
        let words: Vec<&str> = entries.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["sellest", "selle", "ma"]);
    }

    #[test]
    fn duplicate_rewrite_keys_append_alternatives() {
        let entries = parse_rewrites("seal seal\nseal sääl\nseal seal\n", REWRITES_FILE).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].alternatives, vec!["seal", "sääl"]);
    }

    #[test]
    fn single_field_rows_are_skipped() {
        let entries = parse_rewrites("# comment\n\nüksik\nselle sele\n", REWRITES_FILE).unwrap();
        assert_eq!(entries.len(), 1);
        let pairs = parse_pairs("a\nb bee\n", LETTERS_FILE).unwrap();
        assert_eq!(pairs, vec![("b".to_string(), "bee".to_string())]);
    }

    #[test]
    fn extra_pair_fields_are_malformed() {
        let err = parse_pairs("a aa\nb bee 1.0\n", LETTERS_FILE).unwrap_err();
        match err {
            HaaldusError::ConfigParse { file, line, .. } => {
                assert_eq!(file, LETTERS_FILE);
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn characters_outside_alphabet_are_malformed() {
        let err = parse_pairs("a aa\n\nq kuu\n", LETTERS_FILE).unwrap_err();
        assert!(matches!(err, HaaldusError::ConfigParse { line: 3, .. }));
        assert!(err.to_string().starts_with("letters.map:3:"));
    }

    #[test]
    fn bundled_tables_parse() {
        let tables = RuleTables::bundled().unwrap();
        assert!(tables.rewrites.iter().any(|e| e.word == "selle" && e.alternatives == ["sele"]));
        assert!(tables.letters.iter().any(|(from, to)| from == "1" && to == "üks"));
        assert!(!tables.variants.is_empty());
    }

    #[test]
    fn missing_directory_is_io_error() {
        let err = RuleTables::from_dir(Path::new("/nonexistent/haaldus")).unwrap_err();
        assert!(matches!(err, HaaldusError::Io { .. }));
    }
}
