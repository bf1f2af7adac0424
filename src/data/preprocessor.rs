// ============================================================
// Layer 4 — Line Preprocessor
// ============================================================
// Cleans one corpus line before it is split into subwords.
//
// Corpus files scraped from the web often contain:
//   - Non-breaking spaces (U+00A0)
//   - Zero-width spaces (U+200B) and byte order marks
//   - Tabs and stray carriage returns
//   - Runs of several spaces
//
// The vocabulary splits on whitespace, so any of these would
// either create empty tokens or glue two subwords together.
//
// Cleaning steps (applied in order):
//   1. Map Unicode whitespace variants and control chars to space
//   2. Collapse runs of spaces into one
//   3. Trim both ends
//
// A line never contains '\n' after cleaning.
//
// Reference: Rust Book §8 (Strings in Rust)

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean a single corpus line.
    pub fn clean(&self, line: &str) -> String {
        let mut out        = String::with_capacity(line.len());
        let mut last_space = true;

        for c in line.chars() {
            let c = match c {
                '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() => ' ',
                c => c,
            };

            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        // At most one trailing space can survive the loop
        if out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
