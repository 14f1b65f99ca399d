//! Frame header and encoder.

use super::command::CommandType;
use super::errors::CodecError;
use crc::{Crc, CRC_16_ARC};

/// Size of the fixed frame header.
pub const HEADER_LEN: usize = 16;

/// Bytes covered by the header checksum.
const CRC_COVERED_LEN: usize = 14;

/// Largest payload a decoder accepts unless configured otherwise (64 MiB).
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 64 * 1024 * 1024;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);

/// CRC-16/ARC (poly 0x8005 reflected, init 0).
pub fn crc16(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

/// Parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub data_length: u32,
    pub command_code: u16,
    pub reserved: u64,
    pub crc: u16,
}

impl FrameHeader {
    /// Header for a payload of `data_length` bytes, checksum filled in.
    pub fn new(command: CommandType, data_length: u32) -> Self {
        let mut header = Self {
            data_length,
            command_code: command.code(),
            reserved: 0,
            crc: 0,
        };
        header.crc = crc16(&header.to_bytes()[..CRC_COVERED_LEN]);
        header
    }

    pub fn command(&self) -> CommandType {
        CommandType::from_code(self.command_code)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.data_length.to_le_bytes());
        out[4..6].copy_from_slice(&self.command_code.to_le_bytes());
        out[6..14].copy_from_slice(&self.reserved.to_le_bytes());
        out[14..16].copy_from_slice(&self.crc.to_le_bytes());
        out
    }

    /// Parse and checksum-verify 16 header bytes.
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Self, CodecError> {
        let computed = crc16(&bytes[..CRC_COVERED_LEN]);
        let received = u16::from_le_bytes([bytes[14], bytes[15]]);
        if computed != received {
            return Err(CodecError::CrcMismatch { computed, received });
        }

        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[0..4]);
        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&bytes[6..14]);

        Ok(Self {
            data_length: u32::from_le_bytes(len),
            command_code: u16::from_le_bytes([bytes[4], bytes[5]]),
            reserved: u64::from_le_bytes(reserved),
            crc: received,
        })
    }
}

/// Build a complete frame (header + payload).
pub fn encode_frame(command: CommandType, payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let data_length = u32::try_from(payload.len()).map_err(|_| CodecError::PayloadTooLarge {
        announced: payload.len(),
        limit: u32::MAX as usize,
    })?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&FrameHeader::new(command, data_length).to_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}
