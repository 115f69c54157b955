use log::warn;

use crate::analyzer::WORD_SIZE;

/// Bytes reserved by every prologue, whatever the locals need.
pub const FRAME_SIZE: i32 = 128;

/// `ra` and `s0` are saved in the two words just below the frame pointer.
const FIRST_LOCAL_OFFSET: i32 = -12;

/// Hands out `s0`-relative slots for the locals of one activation.
#[derive(Debug)]
pub struct Frame {
    next_offset: i32,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    pub fn new() -> Self {
        Self {
            next_offset: FIRST_LOCAL_OFFSET,
        }
    }

    pub fn reset(&mut self) {
        self.next_offset = FIRST_LOCAL_OFFSET;
    }

    /// Reserves `slots` words for `name` and returns the offset of the first
    /// one. The remaining slots follow it downward. Returns `None` once the
    /// offsets no longer fit in an `i32`.
    pub fn allocate(&mut self, name: &str, slots: usize) -> Option<i32> {
        let offset = self.next_offset;
        let bytes = slots
            .checked_mul(WORD_SIZE)
            .and_then(|bytes| i32::try_from(bytes).ok())?;
        self.next_offset = offset.checked_sub(bytes)?;
        if self.lowest_slot() < -FRAME_SIZE {
            warn!(
                "locals up to '{}' need {} bytes, beyond the {}-byte frame",
                name,
                self.used_bytes(),
                FRAME_SIZE
            );
        }
        Some(offset)
    }

    pub fn lowest_slot(&self) -> i32 {
        self.next_offset + WORD_SIZE as i32
    }

    /// Bytes taken by locals so far, excluding the saved registers.
    pub fn used_bytes(&self) -> usize {
        (i64::from(FIRST_LOCAL_OFFSET) - i64::from(self.next_offset)) as usize
    }
}

/// Offset of element 0 of a variable that starts at `offset` and spans
/// `slots` words, since elements ascend from the lowest slot.
pub fn base_offset(offset: i32, slots: usize) -> i32 {
    offset - (WORD_SIZE * slots.saturating_sub(1)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_decrease_by_slot_size() {
        let mut frame = Frame::new();
        assert_eq!(frame.allocate("a", 1), Some(-12));
        assert_eq!(frame.allocate("b", 1), Some(-16));
        assert_eq!(frame.allocate("arr", 3), Some(-20));
        assert_eq!(frame.allocate("c", 1), Some(-32));
        assert_eq!(frame.used_bytes(), 24);
    }

    #[test]
    fn reset_starts_over() {
        let mut frame = Frame::new();
        frame.allocate("a", 4);
        frame.reset();
        assert_eq!(frame.allocate("b", 1), Some(-12));
    }

    #[test]
    fn array_base_is_lowest_slot() {
        assert_eq!(base_offset(-20, 3), -28);
        assert_eq!(base_offset(-12, 1), -12);
    }

    #[test]
    fn whole_frame_is_usable() {
        let mut frame = Frame::new();
        frame.allocate("big", 30);
        assert_eq!(frame.lowest_slot(), -128);
    }

    #[test]
    fn offsets_never_wrap() {
        let mut frame = Frame::new();
        assert_eq!(frame.allocate("a", 1 << 30), None);
        assert_eq!(frame.allocate("b", 1), Some(-12));

        assert_eq!(frame.allocate("c", 1 << 28), Some(-16));
        assert_eq!(frame.allocate("d", 1 << 28), None);
        assert_eq!(frame.allocate("e", 1), Some(-16 - (1 << 30)));
    }
}
