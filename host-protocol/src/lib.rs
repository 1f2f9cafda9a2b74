// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Host to bootloader serial protocol.
//! The PC running the flashing tool is the host and the STM32 bootloader is the target.
//! Defines the frame layout, the command set and the status codes exchanged between the two.
//!
//! A request frame is `[length, opcode, payload.., crc32 (LE)]` where `length` counts the
//! bytes following itself. The target answers either `[ACK, reply_len, reply..]` or a
//! single `[NACK]` byte.

#![cfg_attr(not(test), no_std)]

mod command;
mod frame;
mod integrity;
mod opcode;
mod reply;
mod status;

pub use command::Command;
pub use frame::{encode_frame, Frame, FrameError, FrameVec};
pub use integrity::{checksum, verify};
pub use opcode::{Opcode, REGISTRY, SUPPORTED_COMMANDS};
pub use reply::{Reply, ReplyError};
pub use status::{AddressStatus, ChangeStatus, EraseStatus, ProtectStatus, ProtectionLevel, Version, WriteStatus};

/// First byte of a positive reply, followed by the reply length.
pub const ACK: u8 = 0xCD;

/// Single byte negative reply. Never followed by a length or payload.
pub const NACK: u8 = 0xAB;

/// Capacity of the target's receive buffer, length byte included.
pub const HOST_BUFFER_SIZE: usize = 200;

/// Size of the CRC trailer of every frame.
pub const CRC_SIZE: usize = 4;

/// Smallest valid value of the length byte: opcode plus CRC, no payload.
pub const MIN_FRAME_LEN: u8 = 1 + CRC_SIZE as u8;

/// Largest block a single memory read may return.
pub const MAX_READ_LEN: u8 = 128;

/// Largest data block that fits a memory write frame:
/// buffer minus length, opcode, address, data length and CRC.
pub const MAX_WRITE_LEN: usize = HOST_BUFFER_SIZE - 1 - 1 - 4 - 1 - CRC_SIZE;
