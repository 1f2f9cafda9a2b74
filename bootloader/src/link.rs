// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use embassy_stm32::mode::Blocking;
use embassy_stm32::usart::{self, Uart};
use embedded_io::{ErrorKind, ErrorType, Read, Write};

/// Host link over a blocking UART. Reads wait until the whole buffer is filled.
pub struct SerialLink<'d> {
    uart: Uart<'d, Blocking>,
}

impl<'d> SerialLink<'d> {
    pub fn new(uart: Uart<'d, Blocking>) -> Self {
        Self { uart }
    }
}

#[derive(Debug, defmt::Format)]
pub struct LinkError(usart::Error);

impl embedded_io::Error for LinkError {
    fn kind(&self) -> ErrorKind {
        match self.0 {
            usart::Error::Framing | usart::Error::Parity => ErrorKind::InvalidData,
            usart::Error::Noise => ErrorKind::InvalidData,
            _ => ErrorKind::Other,
        }
    }
}

impl ErrorType for SerialLink<'_> {
    type Error = LinkError;
}

impl Read for SerialLink<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.uart.blocking_read(buf).map_err(LinkError)?;
        Ok(buf.len())
    }
}

impl Write for SerialLink<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.uart.blocking_write(buf).map_err(LinkError)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.uart.blocking_flush().map_err(LinkError)
    }
}
