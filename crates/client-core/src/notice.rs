//! Single-slot transient notice.

/// At most one notice is visible at a time. Showing a new one replaces the
/// current one and advances the sequence, so a dismissal scheduled against
/// the old notice can never hide its successor.
#[derive(Debug, Default)]
pub struct NoticeSlot {
    current: Option<(u64, String)>,
    next_seq: u64,
}

impl NoticeSlot {
    /// Replaces the visible notice. Returns the sequence the caller must
    /// present back to `clear`.
    pub fn show(&mut self, text: impl Into<String>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.current = Some((seq, text.into()));
        seq
    }

    /// Clears the slot only if `seq` still names the visible notice.
    /// Returns whether anything changed.
    pub fn clear(&mut self, seq: u64) -> bool {
        match &self.current {
            Some((current, _)) if *current == seq => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.current.as_ref().map(|(_, text)| text.as_str())
    }
}
