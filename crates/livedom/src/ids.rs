use core_types::TagId;

/// Resettable monotonic source of element ids.
///
/// Threaded explicitly through builder calls so tests get deterministic ids.
#[derive(Clone, Debug)]
pub struct IdGenerator {
    next: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Continue numbering after `last`, e.g. when resuming from a known tree.
    pub fn starting_after(last: u32) -> Self {
        Self {
            next: last.saturating_add(1),
        }
    }

    pub fn next_id(&mut self) -> TagId {
        let id = TagId::element(self.next);
        self.next = self.next.wrapping_add(1).max(1);
        id
    }

    pub fn peek(&self) -> TagId {
        TagId::element(self.next)
    }

    pub fn reset(&mut self) {
        self.next = 1;
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
