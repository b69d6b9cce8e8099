//! Lexer for Aster source code.

use crate::compiler::tokens::{Span, Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {line}, col {col}")]
    UnexpectedChar { ch: char, line: usize, col: usize },
    #[error("unterminated string at line {line}, col {col}")]
    UnterminatedString { line: usize, col: usize },
    #[error("unterminated character literal at line {line}, col {col}")]
    UnterminatedChar { line: usize, col: usize },
    #[error("unterminated block comment at line {line}, col {col}")]
    UnterminatedComment { line: usize, col: usize },
    #[error("invalid number at line {line}, col {col}")]
    InvalidNumber { line: usize, col: usize },
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    byte_offset: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            byte_offset: 0,
        }
    }

    /// Tokenize the whole input, appending a synthetic `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let Some(ch) = self.current() else { break };
            let start = (self.byte_offset, self.line, self.col);
            let kind = match ch {
                '0'..='9' => self.read_number(start)?,
                '\'' => self.read_char(start)?,
                '"' => self.read_string(start)?,
                c if c.is_ascii_alphabetic() || c == '_' => self.read_word(),
                _ => self.read_operator(start)?,
            };
            tokens.push(Token::new(kind, self.span_from(start)));
        }
        tokens.push(Token::new(
            TokenKind::Eof,
            Span::new(self.byte_offset, self.byte_offset, self.line, self.col),
        ));
        Ok(tokens)
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        self.byte_offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn span_from(&self, (offset, line, col): (usize, usize, usize)) -> Span {
        Span::new(offset, self.byte_offset, line, col)
    }

    /// Skip whitespace, `//` line comments and `/* */` block comments.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.current() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek() == Some('/') => {
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek() == Some('*') => {
                    let (line, col) = (self.line, self.col);
                    self.advance();
                    self.advance();
                    loop {
                        match self.current() {
                            Some('*') if self.peek() == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                            None => return Err(LexError::UnterminatedComment { line, col }),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// `\d+(\.\d+)?([eE][+-]?\d+)?` — a `.` or exponent makes it a float.
    fn read_number(&mut self, start: (usize, usize, usize)) -> Result<TokenKind, LexError> {
        let mut text = String::new();
        let mut is_float = false;

        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.current() == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.advance();
            while let Some(c) = self.current() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if matches!(self.current(), Some('e') | Some('E')) {
            // Only consume the exponent when it is well-formed; otherwise the
            // `e` belongs to a following identifier (e.g. `2elems` is 2, elems).
            let mut lookahead = self.pos + 1;
            if matches!(self.source.get(lookahead), Some('+') | Some('-')) {
                lookahead += 1;
            }
            if self.source.get(lookahead).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.advance();
                if matches!(self.current(), Some('+') | Some('-')) {
                    text.push(self.current().unwrap_or('+'));
                    self.advance();
                }
                while let Some(c) = self.current() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        if is_float {
            text.parse::<f64>()
                .map(TokenKind::FloatLit)
                .map_err(|_| LexError::InvalidNumber {
                    line: start.1,
                    col: start.2,
                })
        } else {
            text.parse::<i64>()
                .map(TokenKind::IntLit)
                .map_err(|_| LexError::InvalidNumber {
                    line: start.1,
                    col: start.2,
                })
        }
    }

    fn decode_escape(c: char) -> char {
        match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            other => other, // \\ \' \" and anything else map to themselves
        }
    }

    /// `'x'` or `'\x'` — exactly one (possibly escaped) character.
    fn read_char(&mut self, start: (usize, usize, usize)) -> Result<TokenKind, LexError> {
        self.advance(); // opening quote
        let value = match self.advance() {
            Some('\\') => {
                let esc = self.advance().ok_or(LexError::UnterminatedChar {
                    line: start.1,
                    col: start.2,
                })?;
                Self::decode_escape(esc)
            }
            Some('\'') | None => {
                return Err(LexError::UnterminatedChar {
                    line: start.1,
                    col: start.2,
                })
            }
            Some(c) => c,
        };
        if self.advance() != Some('\'') {
            return Err(LexError::UnterminatedChar {
                line: start.1,
                col: start.2,
            });
        }
        Ok(TokenKind::CharLit(value))
    }

    fn read_string(&mut self, start: (usize, usize, usize)) -> Result<TokenKind, LexError> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(TokenKind::StringLit(value)),
                Some('\\') => {
                    let esc = self.advance().ok_or(LexError::UnterminatedString {
                        line: start.1,
                        col: start.2,
                    })?;
                    value.push(Self::decode_escape(esc));
                }
                Some(c) => value.push(c),
                None => {
                    return Err(LexError::UnterminatedString {
                        line: start.1,
                        col: start.2,
                    })
                }
            }
        }
    }

    fn read_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(c) = self.current() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match word.as_str() {
            "int" => TokenKind::Int,
            "float" => TokenKind::Float,
            "char" => TokenKind::Char,
            "bool" => TokenKind::Bool,
            "unit" => TokenKind::Unit,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "sizeof" => TokenKind::Sizeof,
            "true" => TokenKind::BoolLit(true),
            "false" => TokenKind::BoolLit(false),
            _ => TokenKind::Ident(word),
        }
    }

    /// Multi-char operators are matched before their single-char prefixes.
    fn read_operator(&mut self, start: (usize, usize, usize)) -> Result<TokenKind, LexError> {
        let ch = self.advance().ok_or(LexError::UnexpectedChar {
            ch: ' ',
            line: start.1,
            col: start.2,
        })?;
        let two = |lexer: &mut Lexer, kind: TokenKind| {
            lexer.advance();
            kind
        };
        let kind = match (ch, self.current()) {
            ('=', Some('=')) => two(self, TokenKind::EqEq),
            ('!', Some('=')) => two(self, TokenKind::NotEq),
            ('<', Some('=')) => two(self, TokenKind::LtEq),
            ('>', Some('=')) => two(self, TokenKind::GtEq),
            ('+', Some('+')) => two(self, TokenKind::PlusPlus),
            ('-', Some('-')) => two(self, TokenKind::MinusMinus),
            ('+', Some('=')) => two(self, TokenKind::PlusAssign),
            ('-', Some('=')) => two(self, TokenKind::MinusAssign),
            ('*', Some('=')) => two(self, TokenKind::StarAssign),
            ('/', Some('=')) => two(self, TokenKind::SlashAssign),
            ('&', Some('&')) => two(self, TokenKind::AmpAmp),
            ('|', Some('|')) => two(self, TokenKind::PipePipe),
            ('<', Some('<')) => two(self, TokenKind::Shl),
            ('>', Some('>')) => two(self, TokenKind::Shr),
            ('-', Some('>')) => two(self, TokenKind::Arrow),
            ('+', _) => TokenKind::Plus,
            ('-', _) => TokenKind::Minus,
            ('*', _) => TokenKind::Star,
            ('/', _) => TokenKind::Slash,
            ('%', _) => TokenKind::Percent,
            ('<', _) => TokenKind::Lt,
            ('>', _) => TokenKind::Gt,
            ('=', _) => TokenKind::Assign,
            ('!', _) => TokenKind::Bang,
            ('&', _) => TokenKind::Amp,
            ('|', _) => TokenKind::Pipe,
            ('^', _) => TokenKind::Caret,
            ('~', _) => TokenKind::Tilde,
            ('[', _) => TokenKind::LBracket,
            (']', _) => TokenKind::RBracket,
            ('(', _) => TokenKind::LParen,
            (')', _) => TokenKind::RParen,
            ('{', _) => TokenKind::LBrace,
            ('}', _) => TokenKind::RBrace,
            (',', _) => TokenKind::Comma,
            (';', _) => TokenKind::Semicolon,
            ('.', _) => TokenKind::Dot,
            (':', _) => TokenKind::Colon,
            (other, _) => {
                return Err(LexError::UnexpectedChar {
                    ch: other,
                    line: start.1,
                    col: start.2,
                })
            }
        };
        Ok(kind)
    }
}

/// Convenience wrapper: lex a full source string.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}
