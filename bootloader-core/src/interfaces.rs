// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Hardware seams of the engine. The board crate implements these over the vendor
//! registers; tests implement them with recording mocks.

use crate::jump::Handover;
use crate::FlashError;

/// A controller that must be unlocked before it accepts program or erase requests.
pub trait Controller {
    fn unlock(&mut self) -> Result<(), FlashError>;
    /// Must be safe to call on an already locked controller.
    fn lock(&mut self);
}

/// Main flash array primitives. Addresses are absolute.
pub trait Flash: Controller {
    /// Erases `pages` consecutive pages starting with the page at `address`.
    fn erase_pages(&mut self, address: u32, pages: u32) -> Result<(), FlashError>;
    fn mass_erase(&mut self) -> Result<(), FlashError>;
    fn program_half_word(&mut self, address: u32, value: u16) -> Result<(), FlashError>;
}

/// Option byte block. Programmed values only take effect after [`OptionBytes::launch`].
pub trait OptionBytes: Controller {
    /// Raw read protection byte. The vendor key value means level 0, anything else level 1.
    fn read_protection(&self) -> u8;
    fn program_read_protection(&mut self, key: u8) -> Result<(), FlashError>;
    /// Write protected page groups, one bit per group, set when protected.
    fn write_protection(&self) -> u32;
    /// Adds the page groups in `groups` to the write protected set.
    fn program_write_protection(&mut self, groups: u32) -> Result<(), FlashError>;
    /// Reloads the option bytes. On hardware this resets the device.
    fn launch(&mut self);
}

/// Identity of the chip and raw memory access.
pub trait Target {
    /// 12-bit device identifier.
    fn chip_id(&self) -> u16;
    /// Copies memory starting at `address` into `buf`. The range must be mapped.
    fn read_memory(&self, address: u32, buf: &mut [u8]);

    fn read_word(&self, address: u32) -> u32 {
        let mut word = [0; 4];
        self.read_memory(address, &mut word);
        u32::from_le_bytes(word)
    }
}

/// The way out of the bootloader.
pub trait ControlTransfer {
    /// Hands the CPU over to other code.
    ///
    /// For [`Handover::Application`] the stack pointer is switched and the peripherals go
    /// back to their reset state before the reset vector is branched to. Nothing running
    /// after the switch may use the bootloader stack, so the whole sequence is one
    /// assembly block on hardware. [`Handover::Raw`] is a plain branch.
    ///
    /// # Safety
    /// Entry points must be executable Thumb code and `msp` the top of a usable stack.
    unsafe fn start(&mut self, handover: Handover) -> !;
}
