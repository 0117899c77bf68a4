//! Lexer écrit à la main : scan caractère par caractère, aucun crate de
//! parsing externe.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    KwFunc,
    KwLet,
    KwReturn,
    KwIf,
    KwElse,
    KwTrue,
    KwFalse,
    Ident(String),
    Int(i64),
    Str(String),
    Plus,
    EqEq,
    Assign,
    Colon,
    Comma,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semicolon,
    Eof,
}

impl fmt::Display for TokKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokKind::KwFunc => write!(f, "'func'"),
            TokKind::KwLet => write!(f, "'let'"),
            TokKind::KwReturn => write!(f, "'return'"),
            TokKind::KwIf => write!(f, "'if'"),
            TokKind::KwElse => write!(f, "'else'"),
            TokKind::KwTrue => write!(f, "'true'"),
            TokKind::KwFalse => write!(f, "'false'"),
            TokKind::Ident(s) => write!(f, "identifier '{s}'"),
            TokKind::Int(n) => write!(f, "integer '{n}'"),
            TokKind::Str(s) => write!(f, "string \"{s}\""),
            TokKind::Plus => write!(f, "'+'"),
            TokKind::EqEq => write!(f, "'=='"),
            TokKind::Assign => write!(f, "'='"),
            TokKind::Colon => write!(f, "':'"),
            TokKind::Comma => write!(f, "','"),
            TokKind::LParen => write!(f, "'('"),
            TokKind::RParen => write!(f, "')'"),
            TokKind::LBrace => write!(f, "'{{'"),
            TokKind::RBrace => write!(f, "'}}'"),
            TokKind::Semicolon => write!(f, "';'"),
            TokKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokKind,
    pub line: u32,
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src: src.as_bytes(), pos: 0, line: 1 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut out = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokKind::Eof;
            out.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(out)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b'/') if self.peek2() == Some(b'/') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_ws_and_comments();
        let line = self.line;
        let Some(c) = self.peek() else {
            return Ok(Token { kind: TokKind::Eof, line });
        };

        let kind = match c {
            b'+' => {
                self.bump();
                TokKind::Plus
            }
            b'=' => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    TokKind::EqEq
                } else {
                    TokKind::Assign
                }
            }
            b':' => {
                self.bump();
                TokKind::Colon
            }
            b',' => {
                self.bump();
                TokKind::Comma
            }
            b'(' => {
                self.bump();
                TokKind::LParen
            }
            b')' => {
                self.bump();
                TokKind::RParen
            }
            b'{' => {
                self.bump();
                TokKind::LBrace
            }
            b'}' => {
                self.bump();
                TokKind::RBrace
            }
            b';' => {
                self.bump();
                TokKind::Semicolon
            }
            b'"' => self.read_string(line)?,
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_ascii_alphabetic() || c == b'_' => self.read_ident(),
            other => return Err(LexError { line, message: format!("unexpected character '{}'", other as char) }),
        };
        Ok(Token { kind, line })
    }

    fn read_string(&mut self, line: u32) -> Result<TokKind, LexError> {
        self.bump(); // guillemet ouvrant
        let mut s = String::new();
        loop {
            match self.bump() {
                None => return Err(LexError { line, message: "unterminated string literal".into() }),
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    Some(b'n') => s.push('\n'),
                    Some(b't') => s.push('\t'),
                    Some(b'r') => s.push('\r'),
                    Some(b'"') => s.push('"'),
                    Some(b'\\') => s.push('\\'),
                    Some(other) => s.push(other as char),
                    None => return Err(LexError { line, message: "unterminated escape sequence".into() }),
                },
                Some(c) => s.push(c as char),
            }
        }
        Ok(TokKind::Str(s))
    }

    fn read_number(&mut self) -> TokKind {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        TokKind::Int(text.parse().unwrap_or(0))
    }

    fn read_ident(&mut self) -> TokKind {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.bump();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        match text {
            "func" => TokKind::KwFunc,
            "let" => TokKind::KwLet,
            "return" => TokKind::KwReturn,
            "if" => TokKind::KwIf,
            "else" => TokKind::KwElse,
            "true" => TokKind::KwTrue,
            "false" => TokKind::KwFalse,
            _ => TokKind::Ident(text.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LexError {
    pub line: u32,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_a_minimal_function() {
        let toks = Lexer::new("func main() { return 1 + 2 }").tokenize().unwrap();
        let kinds: Vec<_> = toks.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokKind::KwFunc,
                TokKind::Ident("main".into()),
                TokKind::LParen,
                TokKind::RParen,
                TokKind::LBrace,
                TokKind::KwReturn,
                TokKind::Int(1),
                TokKind::Plus,
                TokKind::Int(2),
                TokKind::RBrace,
                TokKind::Eof,
            ]
        );
    }

    #[test]
    fn reads_escaped_strings() {
        let toks = Lexer::new(r#""sum=\n""#).tokenize().unwrap();
        assert_eq!(toks[0].kind, TokKind::Str("sum=\n".into()));
    }

    #[test]
    fn skips_line_comments() {
        let toks = Lexer::new("// hi\ntrue").tokenize().unwrap();
        assert_eq!(toks[0].kind, TokKind::KwTrue);
    }

    #[test]
    fn distinguishes_assign_from_eqeq() {
        let toks = Lexer::new("= ==").tokenize().unwrap();
        assert_eq!(toks[0].kind, TokKind::Assign);
        assert_eq!(toks[1].kind, TokKind::EqEq);
    }
}
