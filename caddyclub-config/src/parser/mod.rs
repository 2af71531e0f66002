//! Parser module for Caddyfiles
//!
//! This module provides the line lexer, AST, and block parser.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use lexer::{is_block_close, is_block_open, quote, tokenize_line, unquote, Token};
pub use parser::{parse, parse_directives, parse_with_ids, Parser};
