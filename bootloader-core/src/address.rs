// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Memory windows the host may jump to, write to or read from.

use consts::{FLASH_END, FLASH_START, SRAM_END, SRAM_START};

/// Inclusive address window.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Window {
    pub start: u32,
    pub end: u32,
}

impl Window {
    pub const fn contains(&self, address: u32) -> bool {
        address >= self.start && address <= self.end
    }

    /// True when the `len` bytes starting at `address` all lie in the window.
    /// An empty range only checks `address`.
    pub fn contains_range(&self, address: u32, len: usize) -> bool {
        let Ok(len) = u32::try_from(len) else {
            return false;
        };
        match address.checked_add(len.saturating_sub(1)) {
            Some(last) => self.contains(address) && self.contains(last),
            None => false,
        }
    }

    /// True when any byte of the range falls in the window.
    pub fn overlaps(&self, address: u32, len: usize) -> bool {
        let last = u32::try_from(len.saturating_sub(1))
            .ok()
            .and_then(|span| address.checked_add(span))
            .unwrap_or(u32::MAX);
        address <= self.end && last >= self.start
    }
}

pub const SRAM: Window = Window {
    start: SRAM_START,
    end: SRAM_END,
};

pub const FLASH: Window = Window {
    start: FLASH_START,
    end: FLASH_END,
};

const WINDOWS: [Window; 2] = [SRAM, FLASH];

/// True when `address` is in SRAM or in flash.
pub fn valid(address: u32) -> bool {
    WINDOWS.iter().any(|window| window.contains(address))
}

/// True when the range sits entirely in one window. Ranges straddling both never do,
/// the windows are far apart.
pub fn valid_range(address: u32, len: usize) -> bool {
    WINDOWS.iter().any(|window| window.contains_range(address, len))
}
