//! S-expression reader
//!
//! Reads one form at a time from a byte slice:
//!
//! - `;` starts a comment running to the end of the line
//! - integers with an optional leading `-`; a lone `-` is a symbol
//! - `nil`, `true` and `false` literals
//! - symbols made of `A-Z a-z 0-9 * & + - / _ < > = ! ? . %`
//! - strings in double quotes with `\"`, `\\` and `\n` escapes
//! - proper lists in parentheses
//!
//! Lists are built without native recursion: every open list keeps its
//! head on the argument stack, which also roots it while the rest of the
//! input is read. A closed list gives its slot back, so stack use follows
//! nesting depth.

use silc_gc::{MAX_INT, Value};

use crate::context::Context;
use crate::error::{SilcError, SilcResult};
use crate::symbol::MAX_SYMBOL_LEN;

fn is_symbol_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'*' | b'&' | b'+' | b'-' | b'/' | b'_' | b'<' | b'>' | b'=' | b'!' | b'?' | b'.' | b'%'
        )
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'(' | b')' | b';' | b'"')
}

/// An open list: stack slot of its head and its last cell
struct OpenList {
    head_slot: usize,
    tail: Value,
}

/// Reader over a byte slice
pub struct Reader<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Start reading at the beginning of `src`
    pub fn new(src: &'a [u8]) -> Self {
        Self { src, pos: 0 }
    }

    /// Byte offset of the next unread character
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether only whitespace and comments remain
    pub fn at_end(&mut self) -> bool {
        self.skip_blank();
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_blank(&mut self) {
        while let Some(b) = self.peek() {
            if b == b';' {
                while let Some(b) = self.peek() {
                    if b == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Read the next form; `None` at a clean end of input
    ///
    /// On error the reader is left after the offending character.
    pub fn read(&mut self, ctx: &mut Context) -> SilcResult<Option<Value>> {
        let height = ctx.stack.len();
        let result = self.read_form(ctx);
        ctx.stack.truncate(height);
        result
    }

    fn read_form(&mut self, ctx: &mut Context) -> SilcResult<Option<Value>> {
        let mut open: Vec<OpenList> = Vec::new();
        loop {
            self.skip_blank();
            let Some(b) = self.peek() else {
                return if open.is_empty() {
                    Ok(None)
                } else {
                    Err(SilcError::UnexpectedEof)
                };
            };

            let item = match b {
                b'(' => {
                    self.pos += 1;
                    let head_slot = ctx.stack.push(Value::NIL)?;
                    open.push(OpenList {
                        head_slot,
                        tail: Value::NIL,
                    });
                    continue;
                }
                b')' => {
                    self.pos += 1;
                    let list = open.pop().ok_or(SilcError::UnexpectedCharacter)?;
                    let head = ctx.stack.get(list.head_slot)?;
                    // linking into the parent protects the closed list
                    ctx.stack.truncate(list.head_slot);
                    head
                }
                b'"' => {
                    self.pos += 1;
                    self.read_string(ctx)?
                }
                _ => self.read_atom(ctx)?,
            };

            match open.last_mut() {
                None => return Ok(Some(item)),
                Some(list) => {
                    let cell = ctx.cons(item, Value::NIL);
                    if list.tail.is_nil() {
                        ctx.stack.set(list.head_slot, cell)?;
                    } else {
                        ctx.set_cdr(list.tail, cell);
                    }
                    list.tail = cell;
                }
            }
        }
    }

    fn read_string(&mut self, ctx: &mut Context) -> SilcResult<Value> {
        let mut bytes = Vec::new();
        loop {
            let b = self.peek().ok_or(SilcError::UnexpectedEof)?;
            self.pos += 1;
            match b {
                b'"' => return Ok(ctx.str(&bytes)),
                b'\\' => {
                    let escaped = self.peek().ok_or(SilcError::UnexpectedEof)?;
                    self.pos += 1;
                    bytes.push(match escaped {
                        b'n' => b'\n',
                        b'"' | b'\\' => escaped,
                        _ => return Err(SilcError::UnexpectedCharacter),
                    });
                }
                _ => bytes.push(b),
            }
        }
    }

    fn read_atom(&mut self, ctx: &mut Context) -> SilcResult<Value> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_delimiter(b) {
                break;
            }
            self.pos += 1;
            if !is_symbol_char(b) {
                return Err(SilcError::UnexpectedCharacter);
            }
        }
        let token = &self.src[start..self.pos];

        let digits = token.strip_prefix(b"-").unwrap_or(token);
        if digits.first().is_some_and(u8::is_ascii_digit) {
            return parse_int(token);
        }

        if token.len() > MAX_SYMBOL_LEN {
            return Err(SilcError::SymbolTooBig);
        }
        Ok(match token {
            b"nil" => Value::NIL,
            b"true" => Value::TRUE,
            b"false" => Value::FALSE,
            name => ctx.intern(name),
        })
    }
}

fn parse_int(token: &[u8]) -> SilcResult<Value> {
    let (negative, digits) = match token.strip_prefix(b"-") {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let mut magnitude: i64 = 0;
    for &d in digits {
        if !d.is_ascii_digit() {
            return Err(SilcError::UnexpectedCharacter);
        }
        magnitude = magnitude * 10 + i64::from(d - b'0');
        if magnitude > i64::from(MAX_INT) {
            return Err(SilcError::ValueOutOfRange);
        }
    }
    let v = if negative { -magnitude } else { magnitude };
    Ok(Value::int(v as i32)?)
}
