// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use consts::BASE_APP_ADDR;

use crate::fmt::info;
use crate::{ControlTransfer, Target};

/// How control leaves the bootloader for a given jump address.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Handover {
    /// Start the application like the reset handler would, from its vector table
    Application { msp: u32, reset_vector: u32 },
    /// Branch to the address, Thumb bit set
    Raw(u32),
}

impl Handover {
    /// The application base starts the application: initial stack pointer from the first
    /// vector table word, entry point from the second. Any other address is branched to
    /// as is.
    pub fn for_address<T: Target>(target: &T, address: u32) -> Self {
        if address == BASE_APP_ADDR {
            Handover::Application {
                msp: target.read_word(BASE_APP_ADDR),
                reset_vector: target.read_word(BASE_APP_ADDR + 4),
            }
        } else {
            Handover::Raw(address | 1)
        }
    }
}

/// Transfers control to `address`, which the caller has validated. Never returns.
pub fn transfer<T: Target + ControlTransfer>(target: &mut T, address: u32) -> ! {
    let handover = Handover::for_address(target, address);
    match handover {
        Handover::Application { msp, reset_vector } => {
            info!("starting application: msp {:#x}, reset {:#x}", msp, reset_vector)
        }
        Handover::Raw(entry) => info!("branching to {:#x}", entry),
    }
    // SAFETY: the address lies in flash or SRAM, and the application vector table was
    // put there by the host.
    unsafe { target.start(handover) }
}
