// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::integrity::{checksum, verify};
use crate::{Opcode, CRC_SIZE, HOST_BUFFER_SIZE, MIN_FRAME_LEN};
use heapless::Vec;

/// Owned frame as built by the host, sized to the target's receive buffer.
pub type FrameVec = Vec<u8, HOST_BUFFER_SIZE>;

/// Reasons a frame cannot be decoded or built.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Length byte too small to hold an opcode and a CRC
    #[error("frame length {0} is below the minimum")]
    TooShort(u8),
    /// Frame does not fit the receive buffer
    #[error("frame of {0} bytes does not fit the receive buffer")]
    TooLong(usize),
    /// Fewer bytes available than announced by the length byte
    #[error("frame truncated")]
    Truncated,
    /// Opcode is not part of the command registry
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    /// Payload too short for the fields of the command
    #[error("malformed payload for {0:?}")]
    Malformed(Opcode),
}

/// Borrowed view of one complete frame, length byte included.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Frame<'a> {
    bytes: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Checks the length byte against the frame invariants and the bytes available.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FrameError> {
        let length = *bytes.first().ok_or(FrameError::Truncated)?;
        if length < MIN_FRAME_LEN {
            return Err(FrameError::TooShort(length));
        }
        let total = 1 + length as usize;
        if total > HOST_BUFFER_SIZE {
            return Err(FrameError::TooLong(total));
        }
        let bytes = bytes.get(..total).ok_or(FrameError::Truncated)?;
        Ok(Self { bytes })
    }

    /// Value of the length byte.
    pub fn length(&self) -> u8 {
        self.bytes[0]
    }

    /// Raw opcode byte, not yet checked against the registry.
    pub fn opcode_byte(&self) -> u8 {
        self.bytes[1]
    }

    /// Opcode looked up in the registry.
    pub fn opcode(&self) -> Result<Opcode, FrameError> {
        Opcode::try_from(self.opcode_byte()).map_err(FrameError::UnknownOpcode)
    }

    /// Bytes between the opcode and the CRC trailer.
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[2..self.bytes.len() - CRC_SIZE]
    }

    /// CRC supplied by the host.
    pub fn crc(&self) -> u32 {
        let mut crc = [0; CRC_SIZE];
        crc.copy_from_slice(&self.bytes[self.bytes.len() - CRC_SIZE..]);
        u32::from_le_bytes(crc)
    }

    /// Bytes covered by the CRC: everything but the trailer.
    pub fn covered(&self) -> &'a [u8] {
        &self.bytes[..self.bytes.len() - CRC_SIZE]
    }

    /// Recomputes the CRC and compares it with the trailer.
    pub fn verify(&self) -> bool {
        verify(self.covered(), self.crc())
    }

    /// The whole frame.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Builds `[length, opcode, payload.., crc32]` for sending to the target.
pub fn encode_frame(opcode: Opcode, payload: &[u8]) -> Result<FrameVec, FrameError> {
    let total = 2 + payload.len() + CRC_SIZE;
    if total > HOST_BUFFER_SIZE {
        return Err(FrameError::TooLong(total));
    }

    let mut frame = FrameVec::new();
    // Capacity checked above.
    let _ = frame.push((total - 1) as u8);
    let _ = frame.push(opcode.into());
    let _ = frame.extend_from_slice(payload);
    let crc = checksum(&frame);
    let _ = frame.extend_from_slice(&crc.to_le_bytes());
    Ok(frame)
}
