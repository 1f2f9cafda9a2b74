// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! FLASH and option byte controller of the STM32F1, driven through its registers.

use bootloader_core::protection::{RDP_LEVEL0_KEY, RDP_LEVEL1_KEY};
use bootloader_core::{Controller, Flash, FlashError, OptionBytes};
use consts::{FLASH_PAGE, OPTION_BYTES_ADDR};
use core::ptr;
use defmt::{debug, warn};
use embassy_stm32::pac::FLASH;
use embassy_stm32::peripherals;

const KEY1: u32 = 0x4567_0123;
const KEY2: u32 = 0xCDEF_89AB;

/// Busy polls before giving up on the controller.
const BUSY_TIMEOUT: u32 = 0x00FF_FFFF;

/// Offsets of the option bytes in their block.
const OB_RDP: u32 = 0x0;
const OB_USER: u32 = 0x2;
const OB_DATA: [u32; 2] = [0x4, 0x6];
const OB_WRP: [u32; 4] = [0x8, 0xA, 0xC, 0xE];

/// Waits for the end of the current operation and turns its error flags into an error.
fn wait_ready(address: u32) -> Result<(), FlashError> {
    let mut polls = BUSY_TIMEOUT;
    while FLASH.sr().read().bsy() {
        polls -= 1;
        if polls == 0 {
            return Err(FlashError::Timeout);
        }
    }

    let sr = FLASH.sr().read();
    // Flags are cleared by writing ones
    FLASH.sr().write(|w| {
        w.set_eop(true);
        w.set_pgerr(true);
        w.set_wrprterr(true);
    });
    if sr.wrprterr() {
        return Err(FlashError::WriteProtected(address));
    }
    if sr.pgerr() {
        return Err(FlashError::Program(address));
    }
    Ok(())
}

fn program(address: u32, value: u16) -> Result<(), FlashError> {
    if address % 2 != 0 {
        return Err(FlashError::Program(address));
    }
    // SAFETY: the address is half-word aligned and was validated to lie in flash or the
    // option byte block. The controller is in a programming mode, so the store is turned
    // into a program cycle.
    unsafe { ptr::write_volatile(address as *mut u16, value) };
    wait_ready(address)
}

/// Main flash array. Owns the FLASH peripheral singleton.
pub struct FlashController {
    _flash: peripherals::FLASH,
}

impl FlashController {
    pub fn new(flash: peripherals::FLASH) -> Self {
        Self { _flash: flash }
    }
}

impl Controller for FlashController {
    fn unlock(&mut self) -> Result<(), FlashError> {
        if FLASH.cr().read().lock() {
            FLASH.keyr().write_value(KEY1);
            FLASH.keyr().write_value(KEY2);
        }
        match FLASH.cr().read().lock() {
            true => Err(FlashError::Unlock),
            false => Ok(()),
        }
    }

    fn lock(&mut self) {
        FLASH.cr().modify(|w| w.set_lock(true));
    }
}

impl Flash for FlashController {
    fn erase_pages(&mut self, address: u32, pages: u32) -> Result<(), FlashError> {
        for page in 0..pages {
            let page_address = address + page * FLASH_PAGE;
            debug!("erasing page {:#x}", page_address);
            FLASH.cr().modify(|w| w.set_per(true));
            FLASH.ar().write_value(page_address);
            FLASH.cr().modify(|w| w.set_strt(true));
            let result = wait_ready(page_address);
            FLASH.cr().modify(|w| w.set_per(false));
            result.map_err(|error| match error {
                FlashError::Program(address) => FlashError::Erase(address),
                other => other,
            })?;
        }
        Ok(())
    }

    fn mass_erase(&mut self) -> Result<(), FlashError> {
        warn!("mass erase includes the bootloader");
        FLASH.cr().modify(|w| w.set_mer(true));
        FLASH.cr().modify(|w| w.set_strt(true));
        let result = wait_ready(consts::FLASH_START);
        FLASH.cr().modify(|w| w.set_mer(false));
        result
    }

    fn program_half_word(&mut self, address: u32, value: u16) -> Result<(), FlashError> {
        FLASH.cr().modify(|w| w.set_pg(true));
        let result = program(address, value);
        FLASH.cr().modify(|w| w.set_pg(false));
        result?;
        // SAFETY: the half-word was just programmed and flash is readable again.
        if unsafe { ptr::read_volatile(address as *const u16) } != value {
            return Err(FlashError::Program(address));
        }
        Ok(())
    }
}

/// Contents of the option byte block that survive an option byte erase.
#[derive(Clone, Copy, defmt::Format)]
struct Snapshot {
    rdp: u8,
    user: u8,
    data: [u8; 2],
    /// Raw WRP bytes, a cleared bit protects a group
    wrp: [u8; 4],
}

impl Snapshot {
    fn read() -> Self {
        let byte = |offset: u32| {
            // SAFETY: the option byte block is always mapped and readable.
            unsafe { ptr::read_volatile((OPTION_BYTES_ADDR + offset) as *const u8) }
        };
        Self {
            rdp: byte(OB_RDP),
            user: byte(OB_USER),
            data: OB_DATA.map(byte),
            wrp: OB_WRP.map(byte),
        }
    }

    /// Erases the block and programs this snapshot back, skipping erased values.
    fn rewrite(&self) -> Result<(), FlashError> {
        FLASH.cr().modify(|w| w.set_opter(true));
        FLASH.cr().modify(|w| w.set_strt(true));
        let erased = wait_ready(OPTION_BYTES_ADDR);
        FLASH.cr().modify(|w| w.set_opter(false));
        erased?;

        FLASH.cr().modify(|w| w.set_optpg(true));
        let result = self.program_all();
        FLASH.cr().modify(|w| w.set_optpg(false));
        result
    }

    fn program_all(&self) -> Result<(), FlashError> {
        // The complement half of every option byte is computed by the controller
        program(OPTION_BYTES_ADDR + OB_RDP, self.rdp as u16)?;
        let rest = [(OB_USER, self.user), (OB_DATA[0], self.data[0]), (OB_DATA[1], self.data[1])];
        let wrp = OB_WRP.into_iter().zip(self.wrp);
        for (offset, value) in rest.into_iter().chain(wrp) {
            if value != 0xFF {
                program(OPTION_BYTES_ADDR + offset, value as u16)?;
            }
        }
        Ok(())
    }
}

/// Option byte block, reached through the same FLASH registers.
pub struct OptionBytesController;

impl Controller for OptionBytesController {
    fn unlock(&mut self) -> Result<(), FlashError> {
        if !FLASH.cr().read().optwre() {
            FLASH.optkeyr().write_value(KEY1);
            FLASH.optkeyr().write_value(KEY2);
        }
        match FLASH.cr().read().optwre() {
            true => Ok(()),
            false => Err(FlashError::Unlock),
        }
    }

    fn lock(&mut self) {
        FLASH.cr().modify(|w| w.set_optwre(false));
    }
}

impl OptionBytes for OptionBytesController {
    fn read_protection(&self) -> u8 {
        match FLASH.obr().read().rdprt() {
            true => RDP_LEVEL1_KEY,
            false => RDP_LEVEL0_KEY,
        }
    }

    fn program_read_protection(&mut self, key: u8) -> Result<(), FlashError> {
        let mut snapshot = Snapshot::read();
        snapshot.rdp = key;
        debug!("option bytes: {}", snapshot);
        snapshot.rewrite()
    }

    fn write_protection(&self) -> u32 {
        !FLASH.wrpr().read()
    }

    fn program_write_protection(&mut self, groups: u32) -> Result<(), FlashError> {
        let mut snapshot = Snapshot::read();
        for (index, byte) in snapshot.wrp.iter_mut().enumerate() {
            *byte &= !(groups >> (index * 8)) as u8;
        }
        debug!("option bytes: {}", snapshot);
        snapshot.rewrite()
    }

    fn launch(&mut self) {
        // The F1 reloads its option bytes on reset only
        cortex_m::peripheral::SCB::sys_reset()
    }
}
