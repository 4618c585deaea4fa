// Navigation helpers for Boxed<TextIter>.

use glam::IVec2;
use glimmer_runtime::Boxed;

use crate::boxed::TextIter;

pub trait TextIterExt {
    fn offset(&self) -> i32;
    fn line(&self) -> i32;
    fn line_offset(&self) -> i32;
    /// `(line_offset, line)` as a column/row pair.
    fn position(&self) -> IVec2;
    /// Move within the current line. Clamps at the line start; returns
    /// whether the iterator moved.
    fn forward_chars(&mut self, count: i32) -> bool;
}

impl TextIterExt for Boxed<TextIter> {
    fn offset(&self) -> i32 {
        self.as_ref().offset
    }

    fn line(&self) -> i32 {
        self.as_ref().line
    }

    fn line_offset(&self) -> i32 {
        self.as_ref().line_offset
    }

    fn position(&self) -> IVec2 {
        let it = self.as_ref();
        IVec2::new(it.line_offset, it.line)
    }

    fn forward_chars(&mut self, count: i32) -> bool {
        let it = self.get_mut();
        let step = count.max(-it.line_offset);
        it.offset += step;
        it.line_offset += step;
        step != 0
    }
}
