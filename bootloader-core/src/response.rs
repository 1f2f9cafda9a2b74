// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Reply framing. An ACK header `[ACK, len]` goes out on its own, the reply bytes follow
//! in a second transmission; a NACK is the single byte [`NACK`].

use embedded_io::Write;
use host_protocol::{ACK, NACK};

use crate::error::channel_error;
use crate::Error;

/// Announces a positive reply of `len` bytes.
pub fn ack<W: Write>(channel: &mut W, len: u8) -> Result<(), Error> {
    channel.write_all(&[ACK, len]).map_err(channel_error)?;
    channel.flush().map_err(channel_error)
}

/// Sends the reply bytes announced by [`ack`]. Nothing is sent for an empty reply.
pub fn payload<W: Write>(channel: &mut W, reply: &[u8]) -> Result<(), Error> {
    if reply.is_empty() {
        return Ok(());
    }
    channel.write_all(reply).map_err(channel_error)?;
    channel.flush().map_err(channel_error)
}

/// [`ack`] followed by [`payload`]. Replies are never longer than 255 bytes.
pub fn reply<W: Write>(channel: &mut W, bytes: &[u8]) -> Result<(), Error> {
    let len = bytes.len().min(u8::MAX as usize);
    ack(channel, len as u8)?;
    payload(channel, &bytes[..len])
}

pub fn nack<W: Write>(channel: &mut W) -> Result<(), Error> {
    channel.write_all(&[NACK]).map_err(channel_error)?;
    channel.flush().map_err(channel_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChannel;

    #[test]
    fn header_and_payload_are_separate() {
        let mut channel = MockChannel::default();
        reply(&mut channel, &[100, 1, 0, 0]).unwrap();
        assert_eq!(channel.sent, [vec![0xCD, 0x04], vec![100, 1, 0, 0]]);
    }

    #[test]
    fn nack_is_one_byte() {
        let mut channel = MockChannel::default();
        nack(&mut channel).unwrap();
        assert_eq!(channel.sent, [vec![0xAB]]);
    }

    #[test]
    fn write_failure_is_reported() {
        let mut channel = MockChannel {
            fail_writes: true,
            ..Default::default()
        };
        assert!(matches!(nack(&mut channel), Err(Error::Communication(_))));
    }
}
