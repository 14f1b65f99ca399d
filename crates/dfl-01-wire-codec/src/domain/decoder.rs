//! Incremental frame decoder.

use super::command::CommandType;
use super::errors::CodecError;
use super::header::{FrameHeader, DEFAULT_MAX_PAYLOAD_LEN, HEADER_LEN};
use tracing::{debug, warn};

/// A completed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: CommandType,
    pub payload: Vec<u8>,
}

/// Counters kept for the lifetime of a decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub frames_decoded: u64,
    pub malformed_headers: u64,
}

#[derive(Debug)]
enum DecoderState {
    AwaitingHeader,
    AwaitingPayload {
        command: CommandType,
        remaining: usize,
        buffer: Vec<u8>,
    },
}

/// Stream-to-frame state machine.
///
/// Bytes arrive in arbitrary chunks; every completed frame is handed to the
/// callback passed to [`FrameDecoder::feed`]. Back-to-back frames inside
/// one chunk are all delivered.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    header_buf: Vec<u8>,
    max_payload_len: usize,
    stats: DecoderStats,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD_LEN)
    }

    pub fn with_max_payload(max_payload_len: usize) -> Self {
        Self {
            state: DecoderState::AwaitingHeader,
            header_buf: Vec::with_capacity(HEADER_LEN),
            max_payload_len,
            stats: DecoderStats::default(),
        }
    }

    /// Consume a chunk, invoking `on_frame` for each completed frame.
    ///
    /// Returns the number of frames delivered by this call. A header that
    /// fails its checksum is counted and skipped one byte at a time until a
    /// valid header lines up. `PayloadTooLarge` resets the decoder; the
    /// caller should drop the connection.
    pub fn feed<F>(&mut self, mut chunk: &[u8], mut on_frame: F) -> Result<usize, CodecError>
    where
        F: FnMut(Frame),
    {
        let mut delivered = 0;

        loop {
            match &mut self.state {
                DecoderState::AwaitingHeader => {
                    let needed = HEADER_LEN - self.header_buf.len();
                    let take = needed.min(chunk.len());
                    self.header_buf.extend_from_slice(&chunk[..take]);
                    chunk = &chunk[take..];

                    if self.header_buf.len() < HEADER_LEN {
                        return Ok(delivered);
                    }

                    let mut raw = [0u8; HEADER_LEN];
                    raw.copy_from_slice(&self.header_buf);
                    let header = match FrameHeader::parse(&raw) {
                        Ok(header) => header,
                        Err(e) => {
                            self.stats.malformed_headers += 1;
                            warn!("[dfl-01] malformed packet header: {}", e);
                            self.header_buf.remove(0);
                            continue;
                        }
                    };
                    self.header_buf.clear();

                    let announced = header.data_length as usize;
                    if announced > self.max_payload_len {
                        self.reset();
                        return Err(CodecError::PayloadTooLarge {
                            announced,
                            limit: self.max_payload_len,
                        });
                    }

                    let command = header.command();
                    if command == CommandType::Unknown {
                        debug!(code = header.command_code, "[dfl-01] frame with unassigned command code");
                    }

                    if announced == 0 {
                        self.deliver(command, Vec::new(), &mut on_frame);
                        delivered += 1;
                        continue;
                    }

                    self.state = DecoderState::AwaitingPayload {
                        command,
                        remaining: announced,
                        buffer: Vec::with_capacity(announced.min(64 * 1024)),
                    };
                }
                DecoderState::AwaitingPayload {
                    command,
                    remaining,
                    buffer,
                } => {
                    if chunk.is_empty() {
                        return Ok(delivered);
                    }
                    let take = (*remaining).min(chunk.len());
                    buffer.extend_from_slice(&chunk[..take]);
                    *remaining -= take;
                    chunk = &chunk[take..];

                    if *remaining == 0 {
                        let command = *command;
                        let payload = std::mem::take(buffer);
                        self.state = DecoderState::AwaitingHeader;
                        self.deliver(command, payload, &mut on_frame);
                        delivered += 1;
                    }
                }
            }
        }
    }

    /// Convenience wrapper collecting the frames completed by `chunk`.
    pub fn feed_collect(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, CodecError> {
        let mut frames = Vec::new();
        self.feed(chunk, |frame| frames.push(frame))?;
        Ok(frames)
    }

    /// True when no partial header or payload is buffered.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, DecoderState::AwaitingHeader) && self.header_buf.is_empty()
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Discard any partial frame.
    pub fn reset(&mut self) {
        self.state = DecoderState::AwaitingHeader;
        self.header_buf.clear();
    }

    fn deliver<F: FnMut(Frame)>(&mut self, command: CommandType, payload: Vec<u8>, on_frame: &mut F) {
        self.stats.frames_decoded += 1;
        on_frame(Frame { command, payload });
    }
}
