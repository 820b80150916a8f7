// Character classes and case utilities for Estonian orthography.

// ---------------------------------------------------------------------------
// Estonian alphabet constants
// ---------------------------------------------------------------------------

/// Estonian vowels (lowercase): a e i o u õ ä ö ü
pub const ESTONIAN_VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u', '\u{00F5}', '\u{00E4}', '\u{00F6}', '\u{00FC}'];

/// Digits and punctuation accepted in input words.
const INPUT_SYMBOLS: &str = "0123456789-+/_.:'~";

/// Lowercase letters accepted in input words, including the foreign letters
/// that the pronunciation rules transliterate.
const INPUT_LETTERS: &str = "abcdefghijklmnoprs\u{0161}tuvw\u{00F5}\u{00E4}\u{00F6}\u{00FC}xyz\u{017E}";

/// Foreign letters with diacritics that only appear in loanwords and names.
const FOREIGN_LETTERS: &str = "\u{0107}\u{00E7}\u{010D}\u{0109}\u{00F8}";

/// Left context of plosive gemination: vowels and sonorants.
pub const PLOSIVE_LEFT_CONTEXT: &str = "aeiou\u{00F5}\u{00E4}\u{00F6}\u{00FC}mnlrv";

/// Right context of plosive gemination: sonorants, `j` and vowels.
pub const PLOSIVE_RIGHT_CONTEXT: &str = "lrmnvjaeiou\u{00F5}\u{00E4}\u{00F6}\u{00FC}";

/// Letters that may be spelled out by name.
pub const SPELL_LETTERS: &str = "abcdefghijklmnoprstuv\u{00F5}\u{00E4}\u{00F6}\u{00FC}xyz";

/// Digits that may be spelled out.
pub const SPELL_DIGITS: &str = "1234567890";

/// Punctuation that may be spelled out.
pub const SPELL_PUNCTUATION: &str = "-'/_";

/// Letters with diacritics that belong to the Estonian alphabet and are never
/// folded to a base letter.
const NATIVE_DIACRITIC_LETTERS: &[char] = &['\u{00F6}', '\u{00E4}', '\u{00F5}', '\u{00FC}', '\u{017E}', '\u{0161}'];

// ---------------------------------------------------------------------------
// Alphabet
// ---------------------------------------------------------------------------

/// Every character accepted as input: digits, punctuation, lowercase letters,
/// foreign letters and the uppercase form of each of them.
///
/// The list is deduplicated and keeps first-occurrence order.
pub fn input_chars() -> Vec<char> {
    let mut chars: Vec<char> = Vec::new();
    let lower = INPUT_SYMBOLS.chars().chain(INPUT_LETTERS.chars()).chain(FOREIGN_LETTERS.chars());
    for c in lower {
        if !chars.contains(&c) {
            chars.push(c);
        }
    }
    let uppers: Vec<char> = chars.iter().map(|&c| simple_upper(c)).collect();
    for c in uppers {
        if !chars.contains(&c) {
            chars.push(c);
        }
    }
    chars
}

/// `(upper, lower)` pairs for every input character that has a distinct
/// lowercase form.
pub fn lowercase_pairs() -> Vec<(char, char)> {
    input_chars()
        .into_iter()
        .filter_map(|c| {
            let lower = simple_lower(c);
            (lower != c).then_some((c, lower))
        })
        .collect()
}

/// `(from, to)` pairs that fold foreign diacritics to their base letter.
/// Estonian letters (ö ä õ ü ž š) are left alone, as are characters without
/// a diacritic.
pub fn diacritic_folding_pairs() -> Vec<(char, char)> {
    input_chars()
        .into_iter()
        .filter_map(|c| {
            let folded = fold_diacritic(c);
            (folded != c).then_some((c, folded))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Return the base letter of a foreign letter with a diacritic.
///
/// Letters of the Estonian alphabet and characters without a known base
/// letter are returned unchanged.
pub fn fold_diacritic(c: char) -> char {
    let lower = simple_lower(c);
    if NATIVE_DIACRITIC_LETTERS.contains(&lower) {
        return c;
    }
    let base = match lower {
        '\u{0107}' | '\u{00E7}' | '\u{010D}' | '\u{0109}' => 'c', // ć ç č ĉ
        '\u{00F8}' => 'o',                                        // ø
        '\u{00E9}' | '\u{00E8}' | '\u{00EA}' => 'e',              // é è ê
        '\u{00E1}' | '\u{00E0}' | '\u{00E2}' => 'a',              // á à â
        _ => return c,
    };
    if is_upper(c) { simple_upper(base) } else { base }
}

// ---------------------------------------------------------------------------
// Simple case conversion
//
// The standard library's to_lowercase / to_uppercase produce iterators
// because some characters map to multiple characters; every character of the
// input alphabet maps one-to-one, so only the first character is taken.
// ---------------------------------------------------------------------------

/// Convert a character to its simple lowercase equivalent.
pub fn simple_lower(c: char) -> char {
    let mut iter = c.to_lowercase();
    iter.next().unwrap_or(c)
}

/// Convert a character to its simple uppercase equivalent.
pub fn simple_upper(c: char) -> char {
    let mut iter = c.to_uppercase();
    iter.next().unwrap_or(c)
}

/// Check whether a character is an uppercase letter.
pub fn is_upper(c: char) -> bool {
    c != simple_lower(c)
}
