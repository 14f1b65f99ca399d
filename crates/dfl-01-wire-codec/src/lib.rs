//! # Wire Framing Codec (DFL-01)
//!
//! Every peer message travels as one frame: a fixed 16-byte header followed
//! by exactly `data_length` payload bytes.
//!
//! ## Frame Layout (little-endian)
//!
//! ```text
//! offset  size  field
//! ------  ----  -----------------------------------------------
//!      0     4  data_length   payload bytes that follow
//!      4     2  command_type  see CommandType
//!      6     8  reserved      always 0 on send
//!     14     2  crc16         CRC-16/ARC over bytes 0..14
//!     16     N  payload
//! ```
//!
//! ## Decoder States
//!
//! ```text
//!            16 header bytes, CRC ok
//! AwaitingHeader ─────────────────────────▶ AwaitingPayload{remaining}
//!      ▲   │ CRC bad: drop 1 byte, rescan           │
//!      │   └──────────┘                             │ remaining == 0
//!      └────────────── deliver (command, payload) ◀─┘
//! ```
//!
//! The decoder knows nothing about sockets. It buffers arbitrary chunks and
//! hands each completed frame to the caller's callback.

pub mod domain;

pub use domain::command::CommandType;
pub use domain::decoder::{DecoderStats, Frame, FrameDecoder};
pub use domain::errors::CodecError;
pub use domain::header::{
    crc16, encode_frame, FrameHeader, DEFAULT_MAX_PAYLOAD_LEN, HEADER_LEN,
};
