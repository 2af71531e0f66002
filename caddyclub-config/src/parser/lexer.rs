//! Lexer for Caddyfile lines
//!
//! Tokenizes one physical line of the Caddyfile DSL.
//!
//! Key features:
//! - Tokens are separated by unquoted whitespace
//! - "..." and '...' segments keep their spaces and their quote characters
//! - # outside quotes starts a comment that runs to the end of the line
//! - Only a token that is exactly `{` or `}` is structural

use logos::Logos;

/// Token types for one Caddyfile line
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f\r\n]+")]
pub enum Token {
    #[regex(r"#[^\n]*", logos::skip, allow_greedy = true)]
    Comment,

    /// A run of unquoted characters, backslash escapes and quoted segments.
    /// An unterminated quote swallows the rest of the line.
    #[regex(
        r#"([^ \t\f\r\n"'#]|\\[^\n]|"([^"\\\n]|\\[^\n])*"?|'([^'\\\n]|\\[^\n])*'?)+"#,
        |lex| lex.slice().to_string()
    )]
    Word(String),
}

/// Split one line into tokens. Never fails: text the lexer cannot classify
/// becomes a single trailing token.
pub fn tokenize_line(line: &str) -> Vec<String> {
    let mut lexer = Token::lexer(line);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(Token::Word(word)) => tokens.push(word),
            Ok(Token::Comment) => continue,
            Err(_) => {
                let rest = format!("{}{}", lexer.slice(), lexer.remainder());
                let rest = rest.trim();
                if !rest.is_empty() {
                    tokens.push(rest.to_string());
                }
                break;
            }
        }
    }

    tokens
}

/// True for a token that opens a block
pub fn is_block_open(token: &str) -> bool {
    token == "{"
}

/// True for a token that closes a block
pub fn is_block_close(token: &str) -> bool {
    token == "}"
}

/// Strip one pair of matching surrounding quotes and resolve escaped quotes.
/// Unquoted text is returned unchanged.
pub fn unquote(token: &str) -> String {
    let bytes = token.as_bytes();
    let quoted = bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0];
    if !quoted {
        return token.to_string();
    }

    let quote = bytes[0] as char;
    let inner = &token[1..token.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&quote) {
            result.push(quote);
            chars.next();
        } else {
            result.push(c);
        }
    }

    result
}

/// Quote a value when it would not survive tokenization as a single token
pub fn quote(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\'' || c == '#')
        || is_block_open(value)
        || is_block_close(value);

    if !needs_quotes {
        return value.to_string();
    }

    format!("\"{}\"", value.replace('"', "\\\""))
}
