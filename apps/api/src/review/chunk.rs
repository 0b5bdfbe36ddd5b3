//! Chunk buffering for streamed model output.
//!
//! Upstream deltas arrive at unpredictable granularity — single characters up
//! to multi-sentence fragments. Buffering them into readable chunks keeps the
//! event stream from flooding the client with one event per token.

/// Minimum accumulated size, in characters, before a chunk is emitted.
pub const MIN_CHUNK_CHARS: usize = 50;

/// Sentence-terminating characters that force a chunk out early.
pub const SENTENCE_TERMINATORS: &[char] = &['。', '！', '？', '；', '\n'];

/// Accumulates streamed deltas and yields renderable chunks.
///
/// A chunk is emitted when the accumulator reaches `min_chars`, or when the
/// most recently appended delta contains a sentence terminator. `flush`
/// drains whatever remains after the stream ends; that final chunk is exempt
/// from both conditions.
#[derive(Debug)]
pub struct ChunkBuffer {
    buf: String,
    min_chars: usize,
    terminators: &'static [char],
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::with_limits(MIN_CHUNK_CHARS, SENTENCE_TERMINATORS)
    }

    pub fn with_limits(min_chars: usize, terminators: &'static [char]) -> Self {
        Self {
            buf: String::new(),
            min_chars,
            terminators,
        }
    }

    /// Appends one delta; returns a chunk if an emission boundary was hit.
    pub fn push(&mut self, delta: &str) -> Option<String> {
        self.buf.push_str(delta);
        if self.buf.chars().count() >= self.min_chars || delta.contains(self.terminators) {
            return self.take();
        }
        None
    }

    /// Drains any remaining buffered text as a final chunk.
    pub fn flush(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

impl Default for ChunkBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feeds all deltas through a buffer, returning every emitted chunk
    /// including the final flush.
    fn run(deltas: &[&str]) -> Vec<String> {
        let mut buffer = ChunkBuffer::new();
        let mut chunks: Vec<String> = deltas.iter().filter_map(|d| buffer.push(d)).collect();
        if let Some(tail) = buffer.flush() {
            chunks.push(tail);
        }
        chunks
    }

    #[test]
    fn test_concatenation_preserves_input() {
        let deltas = ["研究", "背景：", "本项目聚焦于", "高温超导。", "下一步", "计划"];
        let chunks = run(&deltas);
        assert_eq!(chunks.concat(), deltas.concat());
    }

    #[test]
    fn test_small_deltas_accumulate_below_threshold() {
        let mut buffer = ChunkBuffer::new();
        assert!(buffer.push("abc").is_none());
        assert!(buffer.push("def").is_none());
        assert_eq!(buffer.flush(), Some("abcdef".to_string()));
    }

    #[test]
    fn test_terminator_in_delta_forces_emission() {
        let mut buffer = ChunkBuffer::new();
        assert_eq!(buffer.push("已完成。"), Some("已完成。".to_string()));
    }

    #[test]
    fn test_newline_counts_as_terminator() {
        let mut buffer = ChunkBuffer::new();
        assert_eq!(buffer.push("line\n"), Some("line\n".to_string()));
    }

    #[test]
    fn test_terminator_only_checked_against_latest_delta() {
        let mut buffer = ChunkBuffer::with_limits(50, SENTENCE_TERMINATORS);
        assert!(buffer.push("句号。").is_some());
        // terminator from the previous delta must not leak into this check
        assert!(buffer.push("后续").is_none());
    }

    #[test]
    fn test_threshold_counts_chars_not_bytes() {
        // 25 Chinese characters are 75 bytes but stay under the 50-char minimum
        let delta = "研".repeat(25);
        let mut buffer = ChunkBuffer::new();
        assert!(buffer.push(&delta).is_none());
        assert_eq!(buffer.push(&delta), Some("研".repeat(50)));
    }

    #[test]
    fn test_every_emitted_chunk_is_nonempty() {
        let chunks = run(&["", "a", "", "b。", ""]);
        assert!(chunks.iter().all(|c| !c.is_empty()));
        assert_eq!(chunks.concat(), "ab。");
    }

    #[test]
    fn test_flush_on_empty_buffer_is_none() {
        let mut buffer = ChunkBuffer::new();
        assert!(buffer.flush().is_none());
        buffer.push("tail");
        assert!(buffer.flush().is_some());
        assert!(buffer.flush().is_none());
    }

    #[test]
    fn test_intermediate_chunks_meet_emission_conditions() {
        let long = "长".repeat(60);
        let deltas = ["短句！", long.as_str(), "ab", "cd", "结尾"];
        let mut buffer = ChunkBuffer::new();
        for delta in &deltas[..deltas.len() - 1] {
            if let Some(chunk) = buffer.push(delta) {
                let long_enough = chunk.chars().count() >= MIN_CHUNK_CHARS;
                let terminated = chunk.contains(SENTENCE_TERMINATORS);
                assert!(long_enough || terminated, "chunk violated both: {chunk}");
            }
        }
    }
}
