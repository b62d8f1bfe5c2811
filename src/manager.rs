use std::ops::Range;

use crate::ast::{Node, unit_count};
use crate::error::{ExpandError, Result};
use crate::parser::Parser;
use crate::settings::{ShortcodeSettings, TriggerKey, builtin_shortcodes};
use crate::tokenizer::Tokenizer;
use crate::transformer::Transformer;

/// An abbreviation found before the cursor, and what it expands to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Byte range of the abbreviation within the inspected line
    pub range: Range<usize>,
    pub abbreviation: String,
    pub output: String,
}

/// Runs the tokenize, parse and transform stages behind one call.
///
/// Holds no per-call state, so one manager can serve any number of callers.
#[derive(Debug, Clone, Default)]
pub struct ShortcodeManager {
    settings: ShortcodeSettings,
    tokenizer: Tokenizer,
    parser: Parser,
    transformer: Transformer,
}

impl ShortcodeManager {
    pub fn new(settings: ShortcodeSettings) -> Self {
        Self {
            tokenizer: Tokenizer::new(settings.limits.max_depth),
            parser: Parser::new(settings.limits.max_depth),
            transformer: Transformer::new(settings.output.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &ShortcodeSettings {
        &self.settings
    }

    /// Tokenize and parse an abbreviation into its validated node forest.
    pub fn parse(&self, input: &str) -> Result<Vec<Node>> {
        let tokens = self.tokenizer.tokenize(input)?;
        self.parser.parse(&tokens)
    }

    /// Expand an abbreviation such as `ul>li*3` into outline text.
    pub fn expand(&self, input: &str) -> Result<String> {
        log::debug!("expanding abbreviation {input:?}");
        let forest = self.parse(input)?;

        let units = unit_count(&forest);
        let limit = self.settings.limits.max_units;
        if units > limit {
            return Err(ExpandError::TooManyUnits { units, limit });
        }

        Ok(self.transformer.transform(&forest))
    }

    /// Like [`ShortcodeManager::expand`], but an exact custom shortcode match
    /// returns its configured text instead.
    pub fn expand_shortcode(&self, input: &str) -> Result<String> {
        if let Some(text) = self.settings.custom_shortcodes.get(input) {
            log::debug!("custom shortcode {input:?} matched");
            return Ok(text.clone());
        }
        self.expand(input)
    }

    /// Trigger hook: decide whether pressing `key` at the end of `line`
    /// should expand an abbreviation, and expand it if so.
    ///
    /// `line` is the text before the cursor. Returns `Ok(None)` when
    /// shortcodes are disabled, `key` is not the trigger, no abbreviation
    /// ends at the cursor, or the text there is not a well-formed
    /// abbreviation (ordinary prose such as `**bold**`). Only limit errors
    /// are returned.
    pub fn check_for_shortcode(&self, line: &str, key: TriggerKey) -> Result<Option<Expansion>> {
        if !self.settings.enabled || key != self.settings.trigger_key {
            return Ok(None);
        }

        let Some(range) = trailing_abbreviation(line) else {
            log::debug!("no abbreviation before cursor");
            return Ok(None);
        };

        let abbreviation = &line[range.clone()];
        let output = match self.expand_shortcode(abbreviation) {
            Ok(output) => output,
            Err(e) if !e.is_too_complex() => {
                log::debug!("{abbreviation:?} is not an abbreviation: {e}");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        Ok(Some(Expansion {
            range,
            abbreviation: abbreviation.to_string(),
            output,
        }))
    }

    /// Help hook: Markdown documentation of the syntax, the built-in
    /// examples with their live expansions, and any custom shortcodes.
    pub fn help_text(&self) -> String {
        let mut lines = vec![
            "# Shortcodes".to_string(),
            String::new(),
            format!(
                "Type an abbreviation and press **{}** to expand it.",
                self.settings.trigger_key
            ),
            String::new(),
            "## Syntax".to_string(),
            String::new(),
            "| Syntax | Meaning | Example |".to_string(),
            "| --- | --- | --- |".to_string(),
        ];
        for (syntax, meaning, example) in SYNTAX {
            lines.push(format!("| `{syntax}` | {meaning} | `{example}` |"));
        }

        lines.push(String::new());
        lines.push("## Built-in examples".to_string());
        for (pattern, description) in builtin_shortcodes() {
            lines.push(String::new());
            lines.push(format!("### `{pattern}`"));
            lines.push(String::new());
            lines.push(description.to_string());
            lines.push(String::new());
            match self.expand(pattern) {
                Ok(output) => {
                    lines.push("```".to_string());
                    lines.push(output);
                    lines.push("```".to_string());
                }
                Err(e) => lines.push(format!("_Cannot expand: {e}_")),
            }
        }

        if !self.settings.custom_shortcodes.is_empty() {
            lines.push(String::new());
            lines.push("## Custom shortcodes".to_string());
            lines.push(String::new());
            for (pattern, text) in &self.settings.custom_shortcodes {
                lines.push(format!("- `{pattern}` → {text}"));
            }
        }

        lines.join("\n")
    }
}

const SYNTAX: [(&str, &str, &str); 7] = [
    ("name", "Element", "div"),
    (">", "Child: nest the next element inside", "ul>li"),
    ("+", "Sibling: place the next element beside", "h2+p"),
    ("*N", "Repeat the element N times", "li*3"),
    ("{text}", "Content", "p{Hello}"),
    ("[key=value]", "Attributes", "a[href=x]"),
    ("( )", "Group for precedence", "(ul>li)+p"),
];

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_abbreviation_char(c: char) -> bool {
    is_name_char(c) || "+>*{}[]()".contains(c)
}

/// Byte range of the abbreviation that ends `line`, if any.
///
/// Inside `{}`, `[]` and `()` spans any character is accepted, so content
/// with spaces stays part of the abbreviation. The abbreviation must start
/// with an element name: a leading group or span is treated as prose.
fn trailing_abbreviation(line: &str) -> Option<Range<usize>> {
    let mut start = line.len();
    let mut depth = 0usize;

    for (i, c) in line.char_indices().rev() {
        match c {
            '}' | ']' | ')' => depth += 1,
            '{' | '[' | '(' if depth > 0 => depth -= 1,
            _ if depth > 0 => {}
            c if is_abbreviation_char(c) => {}
            _ => break,
        }
        start = i;
    }

    // An abbreviation never starts with an operator.
    let skipped = line[start..]
        .find(|c: char| !matches!(c, '>' | '+' | '*'))
        .unwrap_or(line.len() - start);
    start += skipped;

    line[start..]
        .starts_with(is_name_char)
        .then(|| start..line.len())
}
