// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{ACK, NACK};

/// A reply as seen by the host.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reply<'a> {
    /// Command accepted, with its reply payload
    Ack(&'a [u8]),
    /// Command rejected; nothing follows
    Nack,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReplyError {
    #[error("empty reply")]
    Empty,
    #[error("unexpected reply sentinel {0:#04x}")]
    UnknownSentinel(u8),
    #[error("reply truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
}

impl<'a> Reply<'a> {
    /// Decodes a reply from the start of `bytes`; trailing bytes are ignored.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ReplyError> {
        match bytes.first() {
            None => Err(ReplyError::Empty),
            Some(&NACK) => Ok(Reply::Nack),
            Some(&ACK) => {
                let len = *bytes.get(1).ok_or(ReplyError::Truncated { expected: 2, got: 1 })? as usize;
                let payload = bytes.get(2..2 + len).ok_or(ReplyError::Truncated {
                    expected: 2 + len,
                    got: bytes.len(),
                })?;
                Ok(Reply::Ack(payload))
            }
            Some(&other) => Err(ReplyError::UnknownSentinel(other)),
        }
    }

    /// Number of bytes that follow the sentinel byte, once the length byte is known.
    pub fn remaining_after(header: &[u8]) -> Result<usize, ReplyError> {
        match header.first() {
            None => Err(ReplyError::Empty),
            Some(&NACK) => Ok(0),
            Some(&ACK) => header
                .get(1)
                .map(|&len| len as usize)
                .ok_or(ReplyError::Truncated { expected: 2, got: header.len() }),
            Some(&other) => Err(ReplyError::UnknownSentinel(other)),
        }
    }
}
