//! Step cursor - determines which step runs next
//!
//! Runs are strictly sequential: the cursor walks forward one step at a time
//! and only a revision loop may move it backward.

/// Position of a run within its step list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCursor {
    position: usize,
    len: usize,
}

impl StepCursor {
    pub fn new(len: usize) -> Self {
        Self { position: 0, len }
    }

    /// Index of the step to run next, or `None` once past the last step
    pub fn current(&self) -> Option<usize> {
        (self.position < self.len).then_some(self.position)
    }

    /// Move to the following step
    pub fn advance(&mut self) {
        if self.position < self.len {
            self.position += 1;
        }
    }

    /// Move back to an earlier step
    pub fn jump_to(&mut self, index: usize) {
        self.position = index.min(self.len);
    }

    /// Check if the cursor is on the last step
    pub fn is_last(&self) -> bool {
        self.len > 0 && self.position == self.len - 1
    }
}
