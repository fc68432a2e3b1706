//! Input cursor with O(1) checkpoint/restore.
//!
//! A `Cursor` is a byte position into an immutable `&str`. Every position it
//! can reach lies on a UTF-8 character boundary, so `remaining()` never splits
//! a character. One parse owns one cursor; nothing here is shared.

/// Saved cursor position, handed back to [`Cursor::restore`] to backtrack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Mark(usize);

impl Mark {
    pub fn offset(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Cursor<'src> {
    input: &'src str,
    pos: usize,
}

impl<'src> Cursor<'src> {
    pub fn new(input: &'src str) -> Self {
        Self { input, pos: 0 }
    }

    /// The whole input buffer, independent of the current position.
    pub fn input(&self) -> &'src str {
        self.input
    }

    /// Current byte offset. Always `0 <= position() <= input().len()`.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn checkpoint(&self) -> Mark {
        Mark(self.pos)
    }

    /// Moves back (or forward) to `mark`. A mark from another cursor is
    /// clamped to this input and pulled back onto a character boundary.
    pub fn restore(&mut self, mark: Mark) {
        let mut target = mark.0.min(self.input.len());
        while !self.input.is_char_boundary(target) {
            target -= 1;
        }
        self.pos = target;
    }

    /// Advances by `n` bytes, clamped to the remaining length. A count that
    /// ends inside a character moves on to the end of that character.
    pub fn advance(&mut self, n: usize) {
        let mut target = self.pos.saturating_add(n).min(self.input.len());
        while !self.input.is_char_boundary(target) {
            target += 1;
        }
        self.pos = target;
    }

    pub fn remaining(&self) -> &'src str {
        &self.input[self.pos..]
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Consumes and returns the next character.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consumes `prefix` if the remaining input starts with it.
    pub fn eat(&mut self, prefix: &str) -> bool {
        if self.remaining().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    /// Text consumed since `mark`.
    pub fn since(&self, mark: Mark) -> &'src str {
        &self.input[mark.0..self.pos]
    }
}
