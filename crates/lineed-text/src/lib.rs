//! Document buffer, snapshots, and the line type shared across the engine.
//!
//! A [`Document`] is the sole owner of the editor's text while it is live;
//! mutating operations hand displaced content back to the caller as a
//! [`Snapshot`] so it can be retained for undo.

use std::rc::Rc;

/// Initial headroom, in lines, reserved on each side of an empty document.
///
/// Chosen so that front deletions/insertions on a freshly created document
/// can be serviced by adjusting [`Document::offset`] rather than
/// reallocating; see SPEC_FULL.md §12 for why this value was picked.
const INITIAL_CAPACITY: usize = 64;

/// One line of text: an opaque, owned sequence of bytes with no embedded
/// newline. Equality is byte-equality. Cloning is reference transfer (an
/// `Rc` clone), matching the document's "never mutate in place, only swap
/// references" discipline.
#[derive(Clone, Debug, Eq)]
pub struct Line(Rc<[u8]>);

impl Line {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Line(Rc::from(bytes.into()))
    }

    pub fn empty() -> Self {
        Line(Rc::from(Vec::new()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for Line {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Line::new(s.as_bytes().to_vec())
    }
}

impl From<String> for Line {
    fn from(s: String) -> Self {
        Line::new(s.into_bytes())
    }
}

/// An immutable, length-known sequence of [`Line`]s.
///
/// Used both as the payload of a Change command and as the `prev` field of
/// an executed Change/Delete. A length-0 snapshot is the canonical
/// representation of "there was nothing here".
#[derive(Clone, Debug, Default, Eq)]
pub struct Snapshot(Vec<Line>);

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Snapshot {
    pub fn empty() -> Self {
        Snapshot(Vec::new())
    }

    pub fn from_lines(lines: Vec<Line>) -> Self {
        Snapshot(lines)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Line> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.0.iter()
    }

    /// Moves the content out of `self`, leaving it empty. Models the spec's
    /// "cloning is by reference transfer; a snapshot transferred to another
    /// owner leaves the source empty" rule.
    pub fn take(&mut self) -> Snapshot {
        Snapshot(std::mem::take(&mut self.0))
    }

    pub fn into_vec(self) -> Vec<Line> {
        self.0
    }
}

impl FromIterator<Line> for Snapshot {
    fn from_iter<T: IntoIterator<Item = Line>>(iter: T) -> Self {
        Snapshot(iter.into_iter().collect())
    }
}

/// The document buffer: a logical sequence of [`Line`]s addressed by
/// 1-based positions, backed by a growable array with a base `offset` so
/// that deletions/insertions at the front are O(1) amortized instead of
/// O(n).
///
/// Invariants (see spec §3):
/// * `num_lines >= 0`.
/// * every slot in `[offset, offset + num_lines)` holds a live line.
/// * slots outside that window are unobservable through the public API.
pub struct Document {
    storage: Vec<Line>,
    offset: usize,
    num_lines: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let capacity = 2 * INITIAL_CAPACITY;
        Document {
            storage: vec![Line::empty(); capacity],
            offset: INITIAL_CAPACITY,
            num_lines: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.num_lines
    }

    pub fn is_empty(&self) -> bool {
        self.num_lines == 0
    }

    /// Returns the line at 1-based logical position `pos`, or `None` if
    /// `pos` is outside `[1, len()]`. Used by Print, which substitutes a
    /// sentinel for out-of-range addresses itself rather than asking the
    /// document to clamp.
    pub fn line_at(&self, pos: i64) -> Option<Line> {
        if pos < 1 || pos as usize > self.num_lines {
            return None;
        }
        let idx = self.offset + pos as usize - 1;
        Some(self.storage[idx].clone())
    }

    /// Reads the (possibly clamped) range `[start, end]`. No side effects.
    pub fn read(&self, start: i64, end: i64) -> Snapshot {
        let start = if start <= 0 { 1 } else { start as usize };
        if end < start as i64 {
            return Snapshot::empty();
        }
        if start > self.num_lines {
            return Snapshot::empty();
        }
        let end = (end as usize).min(self.num_lines);
        self.read_window(start, end)
    }

    fn read_window(&self, start: usize, end: usize) -> Snapshot {
        if end < start {
            return Snapshot::empty();
        }
        let lines = (start..=end)
            .map(|i| self.storage[self.offset + i - 1].clone())
            .collect();
        Snapshot::from_lines(lines)
    }

    /// Overwrites `[start, end]` with `payload`, growing the document if
    /// `payload` extends past the current end. Returns the displaced lines
    /// (the inverse for undo). `payload` must be non-empty; an empty
    /// payload is the caller's responsibility to special-case per spec §7.2.
    pub fn overwrite(&mut self, start: i64, end: i64, payload: Snapshot) -> Snapshot {
        debug_assert!(!payload.is_empty(), "overwrite requires a non-empty payload");
        let start = if start <= 0 { 1 } else { start as usize };
        if start > self.num_lines + 1 {
            // Precondition violated (start too far past the end); no-op,
            // matching the original's isDataValidForWrite guard.
            return Snapshot::empty();
        }
        let prev_end = (end.max(0) as usize).min(self.num_lines);
        let prev = if start <= self.num_lines {
            self.read_window(start, prev_end)
        } else {
            Snapshot::empty()
        };

        let new_len = self.num_lines.max(start + payload.len() - 1);
        self.ensure_back_room(new_len);
        for (i, line) in payload.iter().enumerate() {
            let idx = self.offset + start + i - 1;
            self.storage[idx] = line.clone();
        }
        self.num_lines = new_len;
        prev
    }

    /// Deletes `[start, end]`, shifting whichever side (head or tail) is
    /// cheaper. Returns the displaced lines.
    pub fn delete_range(&mut self, start: i64, end: i64) -> Snapshot {
        if start > self.num_lines as i64 {
            return Snapshot::empty();
        }
        let start = if start <= 0 { 1 } else { start as usize };
        let k = end - start as i64 + 1;
        if k <= 0 {
            return Snapshot::empty();
        }
        let k = k as usize;
        let prev_end = (end as usize).min(self.num_lines);
        let prev = self.read_window(start, prev_end);

        if end as usize >= self.num_lines {
            self.num_lines = start - 1;
        } else if start == 1 {
            self.offset += k;
            self.num_lines -= k;
        } else {
            let mid = start + k / 2;
            if mid < self.num_lines / 2 {
                self.shift_head_right(start - 1, k);
                self.offset += k;
            } else {
                self.shift_tail_left(end as usize, k);
            }
            self.num_lines -= k;
        }
        prev
    }

    /// Opens a gap of `payload.len()` lines at logical `start` and writes
    /// `payload` into it, shifting whichever side is smaller. Used to
    /// revert a Delete.
    pub fn insert(&mut self, start: i64, payload: Snapshot) {
        let k = payload.len();
        if k == 0 {
            return;
        }
        let start = if start <= 0 { 1 } else { start as usize };
        let elements_before = start - 1;
        let elements_after = self.num_lines.saturating_sub(start - 1);

        if elements_before <= elements_after {
            self.ensure_front_room(k);
            let old_offset = self.offset;
            let new_offset = old_offset - k;
            for i in 0..elements_before {
                self.storage[new_offset + i] = self.storage[old_offset + i].clone();
            }
            self.offset = new_offset;
        } else {
            self.ensure_back_room(self.num_lines + k);
            for i in (start..=self.num_lines).rev() {
                let src = self.offset + i - 1;
                let dst = src + k;
                self.storage[dst] = self.storage[src].clone();
            }
        }

        let write_at = self.offset + start - 1;
        for (i, line) in payload.iter().enumerate() {
            self.storage[write_at + i] = line.clone();
        }
        self.num_lines += k;
    }

    /// Logically empties the document and writes `payload` starting at line
    /// 1. Used to revert a Change whose `prev` was empty and whose `start`
    /// was 1 (the degenerate "document was empty before this Change" case;
    /// see spec §4.6 and §9).
    pub fn replace_whole(&mut self, payload: Snapshot) {
        self.num_lines = 0;
        self.offset = INITIAL_CAPACITY;
        if payload.is_empty() {
            return;
        }
        let prev = self.overwrite(1, payload.len() as i64, payload);
        debug_assert!(prev.is_empty());
    }

    /// Writes `count` literal `.` lines to `sink`. Used by Print for
    /// addresses outside `[1, len()]`; the document itself has nothing to
    /// contribute for those positions.
    pub fn append_sentinel(count: usize, sink: &mut impl std::io::Write) -> std::io::Result<()> {
        for _ in 0..count {
            sink.write_all(b".\n")?;
        }
        Ok(())
    }

    fn shift_head_right(&mut self, count: usize, k: usize) {
        // Destination indices stay within [offset, offset + num_lines), which
        // is already backed by storage, so no growth is needed here.
        let old_offset = self.offset;
        for i in (0..count).rev() {
            self.storage[old_offset + k + i] = self.storage[old_offset + i].clone();
        }
    }

    fn shift_tail_left(&mut self, last: usize, k: usize) {
        let first = last + 1;
        for i in first..=self.num_lines {
            let src = self.offset + i - 1;
            let dst = src - k;
            self.storage[dst] = self.storage[src].clone();
        }
    }

    fn ensure_back_room(&mut self, new_num_lines: usize) {
        let required = self.offset + new_num_lines;
        if self.storage.len() < required {
            let mut capacity = self.storage.len().max(1);
            while capacity < required {
                capacity *= 2;
            }
            self.storage.resize(capacity, Line::empty());
        }
    }

    fn ensure_front_room(&mut self, extra: usize) {
        if self.offset >= extra {
            return;
        }
        let growth = extra.max(self.storage.len()).max(INITIAL_CAPACITY);
        let new_offset = self.offset + growth;
        let new_capacity = new_offset + (self.storage.len() - self.offset);
        let mut new_storage = vec![Line::empty(); new_capacity];
        new_storage[new_offset..new_offset + self.num_lines]
            .clone_from_slice(&self.storage[self.offset..self.offset + self.num_lines]);
        self.storage = new_storage;
        self.offset = new_offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(strs: &[&str]) -> Snapshot {
        Snapshot::from_lines(strs.iter().map(|s| Line::from(*s)).collect())
    }

    fn dump(doc: &Document) -> Vec<String> {
        (1..=doc.len())
            .map(|i| String::from_utf8(doc.line_at(i as i64).unwrap().as_bytes().to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn append_via_overwrite_grows_document() {
        let mut doc = Document::new();
        let prev = doc.overwrite(1, 2, lines(&["first", "second"]));
        assert!(prev.is_empty());
        assert_eq!(doc.len(), 2);
        assert_eq!(dump(&doc), vec!["first", "second"]);
    }

    #[test]
    fn overwrite_in_place_returns_displaced_lines() {
        let mut doc = Document::new();
        doc.overwrite(1, 3, lines(&["a", "b", "c"]));
        let prev = doc.overwrite(2, 2, lines(&["B"]));
        assert_eq!(prev, lines(&["b"]));
        assert_eq!(dump(&doc), vec!["a", "B", "c"]);
    }

    #[test]
    fn overwrite_past_end_plus_one_is_noop() {
        let mut doc = Document::new();
        doc.overwrite(1, 1, lines(&["a"]));
        let prev = doc.overwrite(5, 5, lines(&["x"]));
        assert!(prev.is_empty());
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn delete_middle_shifts_tail() {
        let mut doc = Document::new();
        doc.overwrite(1, 3, lines(&["a", "b", "c"]));
        let prev = doc.delete_range(2, 2);
        assert_eq!(prev, lines(&["b"]));
        assert_eq!(dump(&doc), vec!["a", "c"]);
    }

    #[test]
    fn delete_from_front_uses_offset_not_copy() {
        let mut doc = Document::new();
        doc.overwrite(1, 5, lines(&["a", "b", "c", "d", "e"]));
        doc.delete_range(1, 2);
        assert_eq!(dump(&doc), vec!["c", "d", "e"]);
    }

    #[test]
    fn delete_to_end_truncates() {
        let mut doc = Document::new();
        doc.overwrite(1, 5, lines(&["a", "b", "c", "d", "e"]));
        let prev = doc.delete_range(3, 10);
        assert_eq!(prev, lines(&["c", "d", "e"]));
        assert_eq!(dump(&doc), vec!["a", "b"]);
    }

    #[test]
    fn delete_middle_near_front_shifts_head() {
        let mut doc = Document::new();
        doc.overwrite(
            1,
            10,
            lines(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]),
        );
        // mid = start + k/2 = 2 + 1 = 3, num_lines/2 = 5: mid < num_lines/2,
        // so this falls into shift_head_right rather than shift_tail_left.
        let prev = doc.delete_range(2, 3);
        assert_eq!(prev, lines(&["b", "c"]));
        assert_eq!(
            dump(&doc),
            vec!["a", "d", "e", "f", "g", "h", "i", "j"]
        );

        doc.insert(2, prev);
        assert_eq!(
            dump(&doc),
            vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]
        );
    }

    #[test]
    fn delete_beyond_document_is_noop() {
        let mut doc = Document::new();
        doc.overwrite(1, 2, lines(&["a", "b"]));
        let prev = doc.delete_range(5, 6);
        assert!(prev.is_empty());
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn insert_restores_deleted_middle() {
        let mut doc = Document::new();
        doc.overwrite(1, 3, lines(&["a", "b", "c"]));
        let prev = doc.delete_range(2, 2);
        doc.insert(2, prev);
        assert_eq!(dump(&doc), vec!["a", "b", "c"]);
    }

    #[test]
    fn insert_restores_deleted_front() {
        let mut doc = Document::new();
        doc.overwrite(1, 5, lines(&["a", "b", "c", "d", "e"]));
        let prev = doc.delete_range(1, 2);
        doc.insert(1, prev);
        assert_eq!(dump(&doc), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn replace_whole_resets_then_rebuilds() {
        let mut doc = Document::new();
        doc.overwrite(1, 2, lines(&["a", "b"]));
        doc.replace_whole(Snapshot::empty());
        assert_eq!(doc.len(), 0);
        doc.overwrite(1, 1, lines(&["x"]));
        assert_eq!(dump(&doc), vec!["x"]);
    }

    #[test]
    fn line_at_out_of_range_is_none() {
        let doc = Document::new();
        assert!(doc.line_at(0).is_none());
        assert!(doc.line_at(1).is_none());
        assert!(doc.line_at(-5).is_none());
    }

    #[test]
    fn growth_beyond_initial_capacity_preserves_content() {
        let mut doc = Document::new();
        let many: Vec<String> = (0..500).map(|i| format!("line{i}")).collect();
        let refs: Vec<&str> = many.iter().map(|s| s.as_str()).collect();
        doc.overwrite(1, refs.len() as i64, lines(&refs));
        assert_eq!(doc.len(), 500);
        assert_eq!(doc.line_at(500).unwrap().as_bytes(), b"line499");
    }

    #[test]
    fn append_sentinel_writes_one_dot_line_per_count() {
        let mut out = Vec::new();
        Document::append_sentinel(3, &mut out).unwrap();
        assert_eq!(out, b".\n.\n.\n");
    }

    proptest::proptest! {
        #[test]
        fn append_then_delete_front_matches_model(n in 1usize..64, k in 0usize..64) {
            let mut doc = Document::new();
            let payload: Vec<String> = (0..n).map(|i| format!("l{i}")).collect();
            let refs: Vec<&str> = payload.iter().map(|s| s.as_str()).collect();
            doc.overwrite(1, n as i64, lines(&refs));
            let k = k.min(n);
            if k > 0 {
                doc.delete_range(1, k as i64);
            }
            let expected: Vec<String> = payload[k..].to_vec();
            assert_eq!(dump(&doc), expected);
        }
    }
}
