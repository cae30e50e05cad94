//! Shared tokenizer for the condition/filter and update expression
//! grammars (spec §4.8).

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    NameRef(String),
    ValueRef(String),
    Int(i64),
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

pub fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        let kind = match c {
            '.' => {
                i += 1;
                TokenKind::Dot
            }
            ',' => {
                i += 1;
                TokenKind::Comma
            }
            '(' => {
                i += 1;
                TokenKind::LParen
            }
            ')' => {
                i += 1;
                TokenKind::RParen
            }
            '[' => {
                i += 1;
                TokenKind::LBracket
            }
            ']' => {
                i += 1;
                TokenKind::RBracket
            }
            '+' => {
                i += 1;
                TokenKind::Plus
            }
            '-' => {
                i += 1;
                TokenKind::Minus
            }
            '=' => {
                i += 1;
                TokenKind::Eq
            }
            '<' => {
                i += 1;
                if chars.get(i) == Some(&'>') {
                    i += 1;
                    TokenKind::Ne
                } else if chars.get(i) == Some(&'=') {
                    i += 1;
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                i += 1;
                if chars.get(i) == Some(&'=') {
                    i += 1;
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '#' => {
                i += 1;
                let name = scan_ident(&chars, &mut i);
                if name.is_empty() {
                    return Err(format!("expected name after '#' at pos {start}"));
                }
                TokenKind::NameRef(name)
            }
            ':' => {
                i += 1;
                let name = scan_ident(&chars, &mut i);
                if name.is_empty() {
                    return Err(format!("expected name after ':' at pos {start}"));
                }
                TokenKind::ValueRef(name)
            }
            c if c.is_ascii_digit() => {
                let n = scan_number(&chars, &mut i);
                TokenKind::Int(n.parse().map_err(|_| format!("invalid integer literal at pos {start}"))?)
            }
            c if is_ident_start(c) => {
                let ident = scan_ident(&chars, &mut i);
                TokenKind::Ident(ident)
            }
            other => return Err(format!("unexpected character '{other}' at pos {start}")),
        };
        tokens.push(Token { kind, pos: start });
    }
    tokens.push(Token { kind: TokenKind::Eof, pos: chars.len() });
    Ok(tokens)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn scan_ident(chars: &[char], i: &mut usize) -> String {
    let start = *i;
    while *i < chars.len() && is_ident_continue(chars[*i]) {
        *i += 1;
    }
    chars[start..*i].iter().collect()
}

fn scan_number(chars: &[char], i: &mut usize) -> String {
    let start = *i;
    while *i < chars.len() && chars[*i].is_ascii_digit() {
        *i += 1;
    }
    chars[start..*i].iter().collect()
}
