//! `.vr` world format support.
//!
//! Lexing, the token cursor, the recursive-descent grammar and the loader
//! entry points for DIVE world files.
//!
//! ## Not Supported
//!
//! - Evaluating `begin.tcl ... end.tcl` script blocks (kept verbatim)
//! - Numeric expressions and random-number macros
//! - `#include` and other preprocessor directives
//! - Fetching inlined or included sub-worlds
//!
//! # Example
//!
//! ```ignore
//! use dive_core::vr::{parse_into, make_empty_scene};
//!
//! let scene = parse_into(make_empty_scene(), r#"world "T" { background 0 0 1 }"#);
//! assert_eq!(scene.world.name.as_deref(), Some("T"));
//! ```

mod cursor;
mod lexer;
mod loader;
mod options;
mod parser;
mod token;
mod view;

pub use cursor::TokenCursor;
pub use lexer::{elide_comments, tokenize};
pub use loader::*;
pub use options::*;
pub use parser::{Diagnostic, ParseError, ParseResult, Severity, VrParser};
pub use token::{Token, TokenKind};
