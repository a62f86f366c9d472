#![allow(missing_docs)]

use crate::memory::Pointer;

/// Size of one display list word in bytes.
pub const COMMAND_SIZE: u32 = 8;

/// Call stack over nested display lists.
///
/// Each frame is the pointer to the next command of one display list. A parallel list of
/// labels records where each frame came from for debugging.
#[derive(Debug, Clone, Default)]
pub struct ExecStack {
    frames: Vec<Pointer>,
    labels: Vec<String>,
}

impl ExecStack {
    /// Resets the stack to a single frame at `dl`.
    pub fn start(&mut self, dl: Pointer) {
        self.frames.clear();
        self.labels.clear();
        self.frames.push(dl);
        self.labels.push(dl.to_string());
    }

    pub fn current(&self) -> Option<Pointer> {
        self.frames.last().copied()
    }

    pub fn is_done(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Moves past the current command, which occupies `words` display list words.
    pub fn advance(&mut self, words: usize) {
        if let Some(top) = self.frames.last_mut() {
            *top = top.add(words as u32 * COMMAND_SIZE);
        }
    }

    /// Calls into `target`. The caller must already have advanced past the call site.
    pub fn call(&mut self, target: Pointer, label: String) {
        self.frames.push(target);
        self.labels.push(label);
    }

    /// Replaces the current frame with `target`.
    pub fn branch(&mut self, target: Pointer, label: String) {
        match (self.frames.last_mut(), self.labels.last_mut()) {
            (Some(top), Some(top_label)) => {
                *top = target;
                *top_label = label;
            }
            _ => self.call(target, label),
        }
    }

    /// Returns to the caller of the current list.
    pub fn ret(&mut self) {
        self.frames.pop();
        self.labels.pop();
    }

    /// Where each active frame came from, outermost first.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::BufferHandle;

    #[test]
    fn test_call_branch_return() {
        let root = Pointer::new(BufferHandle(0), 0);
        let child = Pointer::new(BufferHandle(1), 0);
        let other = Pointer::new(BufferHandle(2), 16);

        let mut stack = ExecStack::default();
        stack.start(root);
        stack.advance(1);
        stack.call(child, "child".to_string());
        assert_eq!(stack.depth(), 2);

        stack.branch(other, "other".to_string());
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.current(), Some(other));
        assert_eq!(stack.labels()[1], "other");

        stack.ret();
        assert_eq!(stack.current(), Some(root.add(8)));
        stack.ret();
        assert!(stack.is_done());
    }
}
