use crate::CqlError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    LParen,
    RParen,
    Slash,
    /// `=`, `==`, `<>`, `<`, `>`, `<=`, `>=`
    Symbol(String),
    Word(String),
    Quoted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Character offset into the query.
    pub position: usize,
}

impl Token {
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::Slash => "/".to_string(),
            TokenKind::Symbol(s) | TokenKind::Word(s) => s.clone(),
            TokenKind::Quoted(s) => format!("\"{}\"", s),
        }
    }
}

fn is_word_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '=' | '<' | '>' | '"' | '/')
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, CqlError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        let kind = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '(' => {
                i += 1;
                TokenKind::LParen
            }
            ')' => {
                i += 1;
                TokenKind::RParen
            }
            '/' => {
                i += 1;
                TokenKind::Slash
            }
            '=' | '<' | '>' => {
                let next = chars.get(i + 1).copied();
                let symbol = match (c, next) {
                    ('=', Some('=')) => "==",
                    ('<', Some('>')) => "<>",
                    ('<', Some('=')) => "<=",
                    ('>', Some('=')) => ">=",
                    ('=', _) => "=",
                    ('<', _) => "<",
                    _ => ">",
                };
                i += symbol.len();
                TokenKind::Symbol(symbol.to_string())
            }
            '"' => {
                i += 1;
                let mut value = String::new();
                let mut closed = false;
                while i < chars.len() {
                    match chars[i] {
                        '\\' if i + 1 < chars.len() => {
                            if chars[i + 1] != '"' {
                                value.push('\\');
                            }
                            value.push(chars[i + 1]);
                            i += 2;
                        }
                        '"' => {
                            i += 1;
                            closed = true;
                            break;
                        }
                        other => {
                            value.push(other);
                            i += 1;
                        }
                    }
                }
                if !closed {
                    return Err(CqlError::UnterminatedString(start));
                }
                TokenKind::Quoted(value)
            }
            _ => {
                let mut word = String::new();
                while i < chars.len() && !is_word_boundary(chars[i]) {
                    word.push(chars[i]);
                    i += 1;
                }
                TokenKind::Word(word)
            }
        };
        tokens.push(Token {
            kind,
            position: start,
        });
    }

    Ok(tokens)
}
