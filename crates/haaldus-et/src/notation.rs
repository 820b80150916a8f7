// Plain-ASCII pronunciation notation.
//
// Pronunciations are written as space-separated phones, with the letters
// outside ASCII and the long plosives spelled as two characters.

/// Internal phone and its notation.
const PHONES: &[(char, &str)] = &[
    ('š', "sh"),
    ('õ', "ou"),
    ('ä', "ae"),
    ('ö', "oe"),
    ('ü', "ue"),
    ('K', "kk"),
    ('P', "pp"),
    ('T', "tt"),
];

/// Render an internal pronunciation in notation: `tšaos` becomes
/// `t sh a o s`.
pub fn render_pronunciation(pron: &str) -> String {
    let mut out = String::with_capacity(pron.len() * 2);
    for (i, c) in pron.chars().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        match PHONES.iter().find(|(phone, _)| *phone == c) {
            Some((_, spelled)) => out.push_str(spelled),
            None => out.push(c),
        }
    }
    out
}

/// Parse notation back into an internal pronunciation.
///
/// Two-letter phones are resolved within each space-separated token, so
/// `t s h` stays `tsh` while `t sh` becomes `tš`. Whitespace is removed.
pub fn encode_pronunciation(notation: &str) -> String {
    notation.split_whitespace().map(encode_token).collect()
}

fn encode_token(token: &str) -> String {
    let mut out = token.to_string();
    for (phone, spelled) in PHONES {
        if out.contains(spelled) {
            out = out.replace(spelled, &phone.to_string());
        }
    }
    out
}
