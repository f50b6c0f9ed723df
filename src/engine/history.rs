// src/engine/history.rs
//
// Linear edit history: an arena of immutable snapshots with a cursor.

use crate::raster::RasterImage;

/// Undo/redo stack of image snapshots.
///
/// Entry 0 is the originally loaded image. `current()` is the entry under the
/// cursor. Pushing after an undo drops the redo tail.
#[derive(Clone, Debug)]
pub struct History {
    entries: Vec<RasterImage>,
    cursor: usize,
}

impl History {
    pub fn new(original: RasterImage) -> Self {
        Self {
            entries: vec![original],
            cursor: 0,
        }
    }

    pub fn current(&self) -> &RasterImage {
        &self.entries[self.cursor]
    }

    pub fn original(&self) -> &RasterImage {
        &self.entries[0]
    }

    /// Depth of the undo stack (entries up to and including the cursor).
    pub fn len(&self) -> usize {
        self.cursor + 1
    }

    /// Never empty once constructed.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn push(&mut self, image: RasterImage) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(image);
        self.cursor += 1;
    }

    /// Step back one entry. Returns false (and does nothing) at the original.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        true
    }
}
