//! Per-session read cursor

/// Read position of one session inside the shared log.
///
/// Unset until the session issues a seek; an unset cursor means the
/// session reads the whole log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCursor {
    offset: Option<u64>,
}

impl SessionCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to a virtual offset
    pub fn seek_to(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    /// Current virtual offset, if the session has seeked
    pub fn position(&self) -> Option<u64> {
        self.offset
    }

    pub fn is_set(&self) -> bool {
        self.offset.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_lifecycle() {
        let mut cursor = SessionCursor::new();
        assert_eq!(cursor.position(), None);

        cursor.seek_to(5);
        assert!(cursor.is_set());
        assert_eq!(cursor.position(), Some(5));

        cursor.seek_to(0);
        assert_eq!(cursor.position(), Some(0));
    }
}
