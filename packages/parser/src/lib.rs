//! # Scribe Parser
//!
//! Markup tokenizer, parser and serializer for editable documents, plus the
//! node id generator shared with the editor.
//!
//! Fixtures may carry caret markers: `[]` for a collapsed caret, `[` and `]`
//! for the anchor and focus of a range.

pub mod ast;
pub mod error;
pub mod id_generator;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use ast::{is_void_tag, Fixture, MarkerPos, Markup, VOID_TAGS};
pub use error::{ParseError, ParseResult};
pub use id_generator::{IDGenerator, Oid, ROOT_OID};
pub use parser::{parse, parse_fixture, Parser};
pub use serializer::{serialize, Serializer};
pub use tokenizer::{tokenize, Token};
