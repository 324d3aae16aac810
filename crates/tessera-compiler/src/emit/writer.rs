//! Word-level instruction encoding.

use rspirv::spirv::Op as SpirvOp;

#[derive(Debug, Default)]
pub(super) struct WordWriter {
    words: Vec<u32>,
}

impl WordWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one instruction; the first word packs the word count and opcode.
    pub fn instruction(&mut self, opcode: SpirvOp, body: &[u32]) {
        let count = body.len() as u32 + 1;
        self.words.push((count << 16) | opcode as u32);
        self.words.extend_from_slice(body);
    }

    pub fn into_words(self) -> Vec<u32> {
        self.words
    }
}

/// A nul-terminated UTF-8 literal padded to whole words.
pub(super) fn string_words(text: &str) -> Vec<u32> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
