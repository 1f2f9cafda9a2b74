// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use embedded_io::{ErrorKind, ReadExactError};
use host_protocol::{FrameError, Opcode};

/// Why a command cycle ended early.
///
/// Communication, integrity and protocol errors are answered with a NACK before any ACK.
/// Validation and operation errors surface after the ACK, as a status byte.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[error("channel error: {0:?}")]
    Communication(ErrorKind),
    #[error("crc mismatch: frame carries {expected:#010x}, computed {computed:#010x}")]
    Integrity { expected: u32, computed: u32 },
    #[error("protocol error: {0}")]
    Protocol(#[from] FrameError),
    #[error("{0:?} is not available on this device")]
    Unsupported(Opcode),
    #[error("rejected: {0}")]
    Validation(#[from] Validation),
    #[error("flash operation failed: {0}")]
    Operation(#[from] FlashError),
}

/// Arguments refused before touching the hardware.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Validation {
    #[error("address {0:#010x} is outside of flash and SRAM")]
    Address(u32),
    #[error("range of {len} bytes at {address:#010x} leaves its memory window")]
    Range { address: u32, len: usize },
    #[error("write destination {0:#010x} is not half-word aligned")]
    Unaligned(u32),
    #[error("sectors {start}+{count} exceed the sector count")]
    Sectors { start: u8, count: u8 },
    #[error("unknown protection level {0}")]
    Level(u8),
    #[error("read length {0} out of bounds")]
    ReadLength(u8),
    #[error("flash at {0:#010x} is read protected")]
    ReadProtected(u32),
}

/// Failures reported by the flash and option byte controllers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    #[error("unlock sequence rejected")]
    Unlock,
    #[error("programming error at {0:#010x}")]
    Program(u32),
    #[error("write protected page at {0:#010x}")]
    WriteProtected(u32),
    #[error("erase failed at {0:#010x}")]
    Erase(u32),
    #[error("controller busy")]
    Timeout,
}

pub(crate) fn channel_error<E: embedded_io::Error>(error: E) -> Error {
    Error::Communication(error.kind())
}

pub(crate) fn read_error<E: embedded_io::Error>(error: ReadExactError<E>) -> Error {
    match error {
        ReadExactError::UnexpectedEof => Error::Communication(ErrorKind::Other),
        ReadExactError::Other(error) => channel_error(error),
    }
}
