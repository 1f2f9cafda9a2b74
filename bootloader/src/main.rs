// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

mod flash;
mod link;
mod system;

#[cfg(feature = "debug")]
use defmt_rtt as _;
use panic_probe as _;

use bootloader_core::{Bootloader, Device};
use cortex_m_rt::entry;
use defmt::{info, unwrap};
use embassy_stm32::usart::{self, Uart};
use flash::{FlashController, OptionBytesController};
use link::SerialLink;
use system::System;

#[cfg(not(feature = "debug"))]
mod dummy_logging {
    #[defmt::global_logger]
    struct Logger;

    unsafe impl defmt::Logger for Logger {
        fn acquire() {}

        unsafe fn flush() {}

        unsafe fn release() {}

        unsafe fn write(_bytes: &[u8]) {}
    }
}

/// Baud rate of the host link on USART1 (PA9 TX, PA10 RX).
const HOST_BAUDRATE: u32 = 115_200;

#[entry]
fn main() -> ! {
    let p = embassy_stm32::init(Default::default());
    let core = unwrap!(cortex_m::Peripherals::take());

    let mut config_uart = usart::Config::default();
    config_uart.baudrate = HOST_BAUDRATE;
    let uart = unwrap!(Uart::new_blocking(p.USART1, p.PA10, p.PA9, config_uart));

    info!("bootloader started, host link at {} baud", HOST_BAUDRATE);

    let device = Device {
        channel: SerialLink::new(uart),
        flash: FlashController::new(p.FLASH),
        option_bytes: OptionBytesController,
        target: System::new(core.SYST),
    };
    Bootloader::new(device).run()
}
