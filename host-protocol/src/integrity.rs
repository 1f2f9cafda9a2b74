// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use crc::{Crc, CRC_32_MPEG_2};

/// The STM32 CRC unit: polynomial 0x04C11DB7, seed 0xFFFFFFFF, no reflection, no final xor.
const STM32_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// CRC32 of `data` as the STM32 CRC unit computes it when every byte is
/// written to its data register as one zero-extended 32-bit word.
///
/// Each call starts from a fresh digest; nothing carries over between frames.
pub fn checksum(data: &[u8]) -> u32 {
    let mut digest = STM32_CRC.digest();
    for &byte in data {
        digest.update(&[0, 0, 0, byte]);
    }
    digest.finalize()
}

/// Compares the CRC of `data` against the value supplied by the host.
pub fn verify(data: &[u8], expected: u32) -> bool {
    checksum(data) == expected
}
