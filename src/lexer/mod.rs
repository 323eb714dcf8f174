//! Lexical analysis: line scanning and the token model

pub mod scanner;
pub mod token;

pub use scanner::Scanner;
pub use token::{BracketKind, KeywordKind, OpKind, Token, TokenKind};
