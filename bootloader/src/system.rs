// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use bootloader_core::{ControlTransfer, Handover, Target};
use core::ptr;
use cortex_m::peripheral::{NVIC, SYST};
use embassy_stm32::pac::{rcc, RCC};

/// DBGMCU_IDCODE, the device id sits in the low 12 bits.
const DBGMCU_IDCODE: u32 = 0xE004_2000;

/// Core and clock tree of the MCU.
pub struct System {
    _syst: SYST,
}

impl System {
    pub fn new(syst: SYST) -> Self {
        Self { _syst: syst }
    }
}

impl Target for System {
    fn chip_id(&self) -> u16 {
        // SAFETY: DBGMCU_IDCODE is a read-only register present on every F1 part.
        let idcode = unsafe { ptr::read_volatile(DBGMCU_IDCODE as *const u32) };
        (idcode & 0x0FFF) as u16
    }

    fn read_memory(&self, address: u32, buf: &mut [u8]) {
        for (offset, byte) in (address..).zip(buf.iter_mut()) {
            // SAFETY: the engine only reads ranges it validated against flash and SRAM.
            *byte = unsafe { ptr::read_volatile(offset as *const u8) };
        }
    }
}

impl ControlTransfer for System {
    unsafe fn start(&mut self, handover: Handover) -> ! {
        match handover {
            // Interrupts stay masked from the stack switch until the peripherals are quiet.
            // The reset vector and the link register value live in callee-saved registers
            // across the call to `reset_peripherals`, which runs on the application stack.
            Handover::Application { msp, reset_vector } => core::arch::asm!(
                "cpsid i",
                "msr MSP, {msp}",
                "isb",
                "bl {reset}",
                "cpsie i",
                "mov lr, r5",
                "bx r4",
                msp = in(reg) msp,
                reset = sym reset_peripherals,
                in("r4") reset_vector,
                in("r5") 0xFFFF_FFFFu32,
                options(noreturn),
            ),
            // Link register set so that a return from the entry point faults instead of
            // falling back into the bootloader.
            Handover::Raw(entry) => core::arch::asm!(
                "mov lr, {new_lr}",
                "bx {entry}",
                new_lr = in(reg) 0xFFFF_FFFFu32,
                entry = in(reg) entry,
                options(noreturn),
            ),
        }
    }
}

/// Returns the clock tree and peripherals to their reset state. Only called from the
/// application handover, after the stack switch.
extern "C" fn reset_peripherals() {
    // SAFETY: nothing of the bootloader runs after this. SysTick is owned by `System`,
    // whose stack frame is gone by now.
    unsafe {
        let syst = &*SYST::PTR;
        syst.csr.write(0);

        // Pending state is dropped so the application starts with a quiet NVIC.
        let nvic = &*NVIC::PTR;
        for (icer, icpr) in nvic.icer.iter().zip(nvic.icpr.iter()) {
            icer.write(u32::MAX);
            icpr.write(u32::MAX);
        }
    }

    // Back to HSI with every peripheral held in reset, then released
    RCC.cr().modify(|w| w.set_hsion(true));
    while !RCC.cr().read().hsirdy() {}
    RCC.cfgr().write_value(rcc::regs::Cfgr(0));
    while RCC.cfgr().read().sws() != rcc::vals::Sw::HSI {}
    RCC.cr().modify(|w| {
        w.set_pllon(false);
        w.set_hseon(false);
        w.set_csson(false);
    });
    RCC.apb1rstr().write_value(rcc::regs::Apb1rstr(u32::MAX));
    RCC.apb1rstr().write_value(rcc::regs::Apb1rstr(0));
    RCC.apb2rstr().write_value(rcc::regs::Apb2rstr(u32::MAX));
    RCC.apb2rstr().write_value(rcc::regs::Apb2rstr(0));
}
