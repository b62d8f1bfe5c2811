//! # shortcodes
//!
//! Expands compact, Emmet-like abbreviations into outline text.
//!
//! ```rust
//! let outline = shortcodes::expand("ul>li*3").unwrap();
//! assert_eq!(outline, "ul\n  li\n  li\n  li");
//! ```
//!
//! Expansion runs in three stages, each usable on its own:
//!
//! - [`tokenizer`]: text to [`Token`]s (pest grammar in `abbreviation.pest`)
//! - [`parser`]: tokens to a validated forest of [`Node`]s
//! - [`transformer`]: nodes to output text
//!
//! [`ShortcodeManager`] composes them and adds the editor-facing trigger and
//! help hooks, configured through [`ShortcodeSettings`].

pub mod ast;
pub mod error;
pub mod manager;
pub mod parser;
pub mod settings;
pub mod tokenizer;
pub mod transformer;

pub use ast::{Attributes, Node, NodeKind, Token, TokenKind};
pub use error::{ExpandError, LexError, Result, SettingsError, StructureError};
pub use manager::{Expansion, ShortcodeManager};
pub use parser::Parser;
pub use settings::{Limits, ShortcodeSettings, TriggerKey};
pub use tokenizer::Tokenizer;
pub use transformer::{RenderOptions, Transformer};

/// Expand an abbreviation with default settings.
pub fn expand(input: &str) -> Result<String> {
    ShortcodeManager::default().expand(input)
}
