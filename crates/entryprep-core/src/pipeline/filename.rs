//! Output filename derivation: optional sequencing plus sanitization.

use std::collections::HashMap;

/// Characters that may never appear in an output filename.
const FORBIDDEN: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replace every forbidden filename character with `_`.
///
/// Idempotent: sanitizing an already-sanitized name returns it unchanged.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect()
}

/// Per-identifier sequence counters for one run.
#[derive(Debug, Default)]
pub struct SequenceState {
    next: HashMap<String, u32>,
}

impl SequenceState {
    /// Return the next sequence number for `id` (starting at 1) and advance it.
    pub fn next_for(&mut self, id: &str) -> u32 {
        let counter = self.next.entry(id.to_string()).or_insert(1);
        let seq = *counter;
        *counter += 1;
        seq
    }

    /// Number of distinct identifiers seen so far.
    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }
}

/// Derives safe, optionally sequenced output filenames.
///
/// Sequence numbers follow call order, so records must be fed in processing
/// order and never concurrently.
#[derive(Debug)]
pub struct FilenamePolicy {
    add_sequence: bool,
    sequences: SequenceState,
}

impl FilenamePolicy {
    pub fn new(add_sequence: bool) -> Self {
        Self {
            add_sequence,
            sequences: SequenceState::default(),
        }
    }

    /// Derive the output filename for a raw entry name.
    pub fn derive(&mut self, raw: &str) -> String {
        if !self.add_sequence {
            return sanitize(raw);
        }
        sanitize(&self.sequenced(raw))
    }

    /// `"123-Sunset.jpg"` becomes `"123-1 Sunset.jpg"`, then `"123-2 …"` for
    /// the next entry with the same numeric prefix.
    fn sequenced(&mut self, raw: &str) -> String {
        let digits = raw.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return raw.to_string();
        }
        let (id, rest) = raw.split_at(digits);
        let seq = self.sequences.next_for(id);

        match rest.rsplit_once('.') {
            Some((title, ext)) => {
                let title = title.trim_start_matches(['-', ' ']);
                format!("{id}-{seq} {title}.{ext}")
            }
            None => {
                let rest = rest.trim_start_matches(['-', ' ']);
                format!("{id}-{seq} {rest}")
            }
        }
    }

    pub fn sequences(&self) -> &SequenceState {
        &self.sequences
    }
}
