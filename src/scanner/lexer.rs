//! Tokenizer for C-family source text
//!
//! Produces just enough structure for declaration extraction: identifiers,
//! punctuation, literals and documentation comments. Ordinary comments and
//! whitespace are dropped. Only an unterminated comment or literal is a
//! tokenization failure; any other character becomes punctuation.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Punct,
    StringLit,
    CharLit,
    Number,
    /// A `/** ... */` comment
    DocComment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
}

impl Token {
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct && self.text.len() == 1 && self.text.starts_with(c)
    }

    pub fn is_ident(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }
}

/// Unrecoverable tokenization failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub line: u32,
    pub message: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for LexError {}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer { chars: source.chars().collect(), pos: 0, line: 1, tokens: Vec::new() }.run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    tokens: Vec<Token>,
}

impl Lexer {
    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(c) = self.peek(0) {
            match c {
                '\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                c if c.is_whitespace() => self.pos += 1,
                '/' if self.peek(1) == Some('/') => self.skip_line_comment(),
                '/' if self.peek(1) == Some('*') => self.block_comment()?,
                '"' if self.peek(1) == Some('"') && self.peek(2) == Some('"') => self.text_block()?,
                '"' => self.quoted('"', TokenKind::StringLit, "string literal")?,
                '\'' => self.quoted('\'', TokenKind::CharLit, "character literal")?,
                c if c.is_alphabetic() || c == '_' || c == '$' => self.identifier(),
                c if c.is_ascii_digit() => self.number(),
                c => {
                    self.push(TokenKind::Punct, c.to_string(), self.line);
                    self.pos += 1;
                }
            }
        }
        Ok(self.tokens)
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, text: String, line: u32) {
        self.tokens.push(Token { kind, text, line });
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn block_comment(&mut self) -> Result<(), LexError> {
        let start_line = self.line;
        // `/**/` is an empty ordinary comment, not documentation
        let is_doc = self.peek(2) == Some('*') && self.peek(3) != Some('/');
        self.pos += 2;

        let body_start = self.pos;
        loop {
            match self.peek(0) {
                None => {
                    return Err(LexError {
                        line: start_line,
                        message: "unterminated block comment".to_string(),
                    })
                }
                Some('*') if self.peek(1) == Some('/') => {
                    let body: String = self.chars[body_start..self.pos].iter().collect();
                    self.pos += 2;
                    if is_doc {
                        self.push(TokenKind::DocComment, body, start_line);
                    }
                    return Ok(());
                }
                Some('\n') => {
                    self.line += 1;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn text_block(&mut self) -> Result<(), LexError> {
        let start_line = self.line;
        self.pos += 3;
        let body_start = self.pos;

        loop {
            match self.peek(0) {
                None => {
                    return Err(LexError {
                        line: start_line,
                        message: "unterminated text block".to_string(),
                    })
                }
                Some('\\') => {
                    if self.peek(1) == Some('\n') {
                        self.line += 1;
                    }
                    self.pos += 2;
                }
                Some('"') if self.peek(1) == Some('"') && self.peek(2) == Some('"') => {
                    let body: String = self.chars[body_start..self.pos].iter().collect();
                    self.pos += 3;
                    self.push(TokenKind::StringLit, body, start_line);
                    return Ok(());
                }
                Some('\n') => {
                    self.line += 1;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn quoted(&mut self, quote: char, kind: TokenKind, what: &str) -> Result<(), LexError> {
        let start_line = self.line;
        self.pos += 1;
        let body_start = self.pos;

        loop {
            match self.peek(0) {
                None | Some('\n') => {
                    return Err(LexError { line: start_line, message: format!("unterminated {what}") })
                }
                Some('\\') => self.pos += 2,
                Some(c) if c == quote => {
                    let body: String = self.chars[body_start..self.pos].iter().collect();
                    self.pos += 1;
                    self.push(kind, body, start_line);
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn identifier(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek(0) {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Ident, text, self.line);
    }

    fn number(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek(0) {
            let exponent_sign = (c == '+' || c == '-')
                && matches!(self.chars.get(self.pos.wrapping_sub(1)), Some('e' | 'E' | 'p' | 'P'))
                && !self.chars[start..self.pos].iter().any(|c| matches!(c, 'x' | 'X'));
            if c.is_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Number, text, self.line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source).unwrap().into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn test_drops_comments_keeps_doc() {
        let tokens = tokenize("// line\n/* block */\n/** Doc. */\nclass A {}").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::DocComment);
        assert_eq!(tokens[0].line, 3);
        assert!(tokens[1].is_ident("class"));
        assert_eq!(tokens[1].line, 4);
        assert!(tokens[3].is_punct('{'));
    }

    #[test]
    fn test_empty_block_comment_is_not_doc() {
        let tokens = tokenize("/**/ int x;").unwrap();
        assert!(tokens.iter().all(|t| t.kind != TokenKind::DocComment));
    }

    #[test]
    fn test_literals_hide_braces() {
        let toks = kinds(r#"s = "a { b \" }"; c = '}'; n = 1.5e-3;"#);
        assert!(toks.contains(&(TokenKind::StringLit, r#"a { b \" }"#.to_string())));
        assert!(toks.contains(&(TokenKind::CharLit, "}".to_string())));
        assert!(toks.contains(&(TokenKind::Number, "1.5e-3".to_string())));
        assert!(!toks.iter().any(|(k, t)| *k == TokenKind::Punct && t == "}"));
    }

    #[test]
    fn test_text_block_tracks_lines() {
        let tokens = tokenize("String s = \"\"\"\n  {\n  \"\"\";\nint y;").unwrap();
        let y = tokens.iter().find(|t| t.is_ident("y")).unwrap();
        assert_eq!(y.line, 4);
    }

    #[test]
    fn test_unterminated_inputs_fail() {
        assert_eq!(tokenize("/* open").unwrap_err().message, "unterminated block comment");
        assert_eq!(tokenize("x = \"open\n").unwrap_err().message, "unterminated string literal");
        assert_eq!(tokenize("c = 'a").unwrap_err().message, "unterminated character literal");
        let err = tokenize("a\nb\ns = \"\"\"\nnever closed").unwrap_err();
        assert_eq!((err.line, err.message.as_str()), (3, "unterminated text block"));
    }

    #[test]
    fn test_unknown_characters_are_punctuation() {
        let toks = kinds("a # b §");
        assert_eq!(toks.len(), 4);
        assert_eq!(toks[1], (TokenKind::Punct, "#".to_string()));
    }
}
