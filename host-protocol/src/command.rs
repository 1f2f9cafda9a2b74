// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::frame::{encode_frame, Frame, FrameError, FrameVec};
use crate::{Opcode, HOST_BUFFER_SIZE};
use heapless::Vec;

/// A decoded request, one variant per opcode.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    /// Request the bootloader version
    GetVersion,
    /// Request the list of supported opcodes
    GetHelp,
    /// Request the MCU device identifier
    GetChipId,
    /// Request the flash read protection level
    GetRdpStatus,
    /// Jump to `address`; the application base address starts the application
    JumpToAddress { address: u32 },
    /// Erase `count` sectors from `start_sector`, or everything when `count` is 0xFF
    EraseFlash { start_sector: u8, count: u8 },
    /// Program `data` at `address`
    MemoryWrite { address: u32, data: &'a [u8] },
    /// Write protect `count` sectors from `start_sector`
    EnableRwProtect { start_sector: u8, count: u8 },
    /// Read `len` bytes from `address`
    MemoryRead { address: u32, len: u8 },
    /// Request the write protection state of every sector
    ReadSectorStatus,
    /// Request the one-time-programmable area
    OtpRead,
    /// Change the read protection to `level` (0 or 1)
    ChangeRopLevel { level: u8 },
}

impl<'a> Command<'a> {
    /// Decodes the payload of a frame whose opcode is already known.
    /// Query commands ignore any payload bytes.
    pub fn parse(opcode: Opcode, payload: &'a [u8]) -> Result<Self, FrameError> {
        let malformed = FrameError::Malformed(opcode);
        let command = match opcode {
            Opcode::GetVersion => Command::GetVersion,
            Opcode::GetHelp => Command::GetHelp,
            Opcode::GetChipId => Command::GetChipId,
            Opcode::GetRdpStatus => Command::GetRdpStatus,
            Opcode::ReadSectorStatus => Command::ReadSectorStatus,
            Opcode::OtpRead => Command::OtpRead,
            Opcode::JumpToAddress => {
                let (address, _) = read_address(payload).ok_or(malformed)?;
                Command::JumpToAddress { address }
            }
            Opcode::EraseFlash => {
                let [start_sector, count] = read_pair(payload).ok_or(malformed)?;
                Command::EraseFlash { start_sector, count }
            }
            Opcode::EnableRwProtect => {
                let [start_sector, count] = read_pair(payload).ok_or(malformed)?;
                Command::EnableRwProtect { start_sector, count }
            }
            Opcode::MemoryWrite => {
                let (address, rest) = read_address(payload).ok_or(malformed)?;
                let (&len, rest) = rest.split_first().ok_or(malformed)?;
                // The declared length must be backed by bytes inside this frame.
                let data = rest.get(..len as usize).ok_or(malformed)?;
                Command::MemoryWrite { address, data }
            }
            Opcode::MemoryRead => {
                let (address, rest) = read_address(payload).ok_or(malformed)?;
                let len = *rest.first().ok_or(malformed)?;
                Command::MemoryRead { address, len }
            }
            Opcode::ChangeRopLevel => {
                let level = *payload.first().ok_or(malformed)?;
                Command::ChangeRopLevel { level }
            }
        };
        Ok(command)
    }

    /// Looks up the opcode of a frame and decodes its payload.
    pub fn from_frame(frame: &Frame<'a>) -> Result<Self, FrameError> {
        Self::parse(frame.opcode()?, frame.payload())
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Command::GetVersion => Opcode::GetVersion,
            Command::GetHelp => Opcode::GetHelp,
            Command::GetChipId => Opcode::GetChipId,
            Command::GetRdpStatus => Opcode::GetRdpStatus,
            Command::JumpToAddress { .. } => Opcode::JumpToAddress,
            Command::EraseFlash { .. } => Opcode::EraseFlash,
            Command::MemoryWrite { .. } => Opcode::MemoryWrite,
            Command::EnableRwProtect { .. } => Opcode::EnableRwProtect,
            Command::MemoryRead { .. } => Opcode::MemoryRead,
            Command::ReadSectorStatus => Opcode::ReadSectorStatus,
            Command::OtpRead => Opcode::OtpRead,
            Command::ChangeRopLevel { .. } => Opcode::ChangeRopLevel,
        }
    }

    /// Builds the complete request frame, CRC included.
    pub fn to_frame(&self) -> Result<FrameVec, FrameError> {
        let mut payload: Vec<u8, HOST_BUFFER_SIZE> = Vec::new();
        let overflow = |_| FrameError::TooLong(HOST_BUFFER_SIZE + 1);
        match *self {
            Command::GetVersion
            | Command::GetHelp
            | Command::GetChipId
            | Command::GetRdpStatus
            | Command::ReadSectorStatus
            | Command::OtpRead => {}
            Command::JumpToAddress { address } => {
                payload.extend_from_slice(&address.to_le_bytes()).map_err(overflow)?;
            }
            Command::EraseFlash { start_sector, count } | Command::EnableRwProtect { start_sector, count } => {
                payload.extend_from_slice(&[start_sector, count]).map_err(overflow)?;
            }
            Command::MemoryWrite { address, data } => {
                let len = u8::try_from(data.len()).map_err(|_| FrameError::TooLong(data.len()))?;
                payload.extend_from_slice(&address.to_le_bytes()).map_err(overflow)?;
                payload.push(len).map_err(|_| FrameError::TooLong(HOST_BUFFER_SIZE + 1))?;
                payload.extend_from_slice(data).map_err(overflow)?;
            }
            Command::MemoryRead { address, len } => {
                payload.extend_from_slice(&address.to_le_bytes()).map_err(overflow)?;
                payload.push(len).map_err(|_| FrameError::TooLong(HOST_BUFFER_SIZE + 1))?;
            }
            Command::ChangeRopLevel { level } => {
                payload.push(level).map_err(|_| FrameError::TooLong(HOST_BUFFER_SIZE + 1))?;
            }
        }
        encode_frame(self.opcode(), &payload)
    }
}

fn read_address(payload: &[u8]) -> Option<(u32, &[u8])> {
    let (address, rest) = payload.split_first_chunk::<4>()?;
    Some((u32::from_le_bytes(*address), rest))
}

fn read_pair(payload: &[u8]) -> Option<[u8; 2]> {
    payload.first_chunk::<2>().copied()
}
