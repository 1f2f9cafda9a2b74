// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Recording doubles for the hardware traits.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use consts::BASE_APP_ADDR;
use embedded_io::{ErrorKind, ErrorType, Read, Write};

use crate::jump::Handover;
use crate::protection::RDP_LEVEL0_KEY;
use crate::{Controller, ControlTransfer, Flash, FlashError, OptionBytes, Target};

/// Hardware calls in the order they happened.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    FlashUnlock,
    FlashLock,
    ErasePages { address: u32, pages: u32 },
    MassErase,
    Program { address: u32, value: u16 },
    OptionUnlock,
    OptionLock,
    ProgramReadProtection(u8),
    ProgramWriteProtection(u32),
    Launch,
    Start(Handover),
}

pub type Log = Rc<RefCell<Vec<Event>>>;

/// Payload of the unwinding panic standing in for a handover that never returns.
#[derive(Debug)]
pub struct Started(pub Handover);

#[derive(Debug, Eq, PartialEq)]
pub struct Disconnected;

impl embedded_io::Error for Disconnected {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Serial link fed from a byte queue. Every `write` call is recorded as one transmission.
#[derive(Default)]
pub struct MockChannel {
    pub incoming: VecDeque<u8>,
    pub sent: Vec<Vec<u8>>,
    pub fail_writes: bool,
}

impl MockChannel {
    pub fn with_input(bytes: &[u8]) -> Self {
        Self {
            incoming: bytes.iter().copied().collect(),
            ..Default::default()
        }
    }

    /// All transmitted bytes, concatenated.
    pub fn output(&self) -> Vec<u8> {
        self.sent.concat()
    }
}

impl ErrorType for MockChannel {
    type Error = Disconnected;
}

impl Read for MockChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.incoming.is_empty() {
            return Err(Disconnected);
        }
        let count = buf.len().min(self.incoming.len());
        for (slot, byte) in buf.iter_mut().zip(self.incoming.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

impl Write for MockChannel {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes {
            return Err(Disconnected);
        }
        self.sent.push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MockFlash {
    pub log: Log,
    pub fail_unlock: bool,
    pub fail_erase: bool,
    pub fail_program_at: Option<u32>,
}

impl Controller for MockFlash {
    fn unlock(&mut self) -> Result<(), FlashError> {
        self.log.borrow_mut().push(Event::FlashUnlock);
        if self.fail_unlock {
            return Err(FlashError::Unlock);
        }
        Ok(())
    }

    fn lock(&mut self) {
        self.log.borrow_mut().push(Event::FlashLock);
    }
}

impl Flash for MockFlash {
    fn erase_pages(&mut self, address: u32, pages: u32) -> Result<(), FlashError> {
        self.log
            .borrow_mut()
            .push(Event::ErasePages { address, pages });
        if self.fail_erase {
            return Err(FlashError::Erase(address));
        }
        Ok(())
    }

    fn mass_erase(&mut self) -> Result<(), FlashError> {
        self.log.borrow_mut().push(Event::MassErase);
        if self.fail_erase {
            return Err(FlashError::Erase(0));
        }
        Ok(())
    }

    fn program_half_word(&mut self, address: u32, value: u16) -> Result<(), FlashError> {
        self.log.borrow_mut().push(Event::Program { address, value });
        if self.fail_program_at == Some(address) {
            return Err(FlashError::Program(address));
        }
        Ok(())
    }
}

/// Option bytes whose programmed values show up only after `launch`.
pub struct MockOptionBytes {
    pub log: Log,
    pub rdp: u8,
    pub wrp: u32,
    pub pending_rdp: Option<u8>,
    pub pending_wrp: u32,
    pub fail_unlock: bool,
    pub fail_program: bool,
}

impl Default for MockOptionBytes {
    fn default() -> Self {
        Self::with_log(Log::default())
    }
}

impl MockOptionBytes {
    pub fn with_log(log: Log) -> Self {
        Self {
            log,
            rdp: RDP_LEVEL0_KEY,
            wrp: 0,
            pending_rdp: None,
            pending_wrp: 0,
            fail_unlock: false,
            fail_program: false,
        }
    }
}

impl Controller for MockOptionBytes {
    fn unlock(&mut self) -> Result<(), FlashError> {
        self.log.borrow_mut().push(Event::OptionUnlock);
        if self.fail_unlock {
            return Err(FlashError::Unlock);
        }
        Ok(())
    }

    fn lock(&mut self) {
        self.log.borrow_mut().push(Event::OptionLock);
    }
}

impl OptionBytes for MockOptionBytes {
    fn read_protection(&self) -> u8 {
        self.rdp
    }

    fn program_read_protection(&mut self, key: u8) -> Result<(), FlashError> {
        self.log
            .borrow_mut()
            .push(Event::ProgramReadProtection(key));
        if self.fail_program {
            return Err(FlashError::Program(consts::OPTION_BYTES_ADDR));
        }
        self.pending_rdp = Some(key);
        Ok(())
    }

    fn write_protection(&self) -> u32 {
        self.wrp
    }

    fn program_write_protection(&mut self, groups: u32) -> Result<(), FlashError> {
        self.log
            .borrow_mut()
            .push(Event::ProgramWriteProtection(groups));
        if self.fail_program {
            return Err(FlashError::Program(consts::OPTION_BYTES_ADDR));
        }
        self.pending_wrp |= groups;
        Ok(())
    }

    fn launch(&mut self) {
        self.log.borrow_mut().push(Event::Launch);
        if let Some(rdp) = self.pending_rdp.take() {
            self.rdp = rdp;
        }
        self.wrp |= core::mem::take(&mut self.pending_wrp);
    }
}

/// Memory reads return the low byte of each address, except for the application's
/// vector table which holds `vector_table`.
pub struct MockTarget {
    pub log: Log,
    pub chip_id: u16,
    pub vector_table: [u32; 2],
}

impl MockTarget {
    pub fn with_log(log: Log) -> Self {
        Self {
            log,
            chip_id: 0x410,
            vector_table: [0x2000_5000, 0x0800_8145],
        }
    }

    fn byte_at(&self, address: u32) -> u8 {
        match address.checked_sub(BASE_APP_ADDR) {
            Some(offset @ 0..=7) => {
                let word = self.vector_table[offset as usize / 4];
                word.to_le_bytes()[offset as usize % 4]
            }
            _ => address as u8,
        }
    }
}

impl Target for MockTarget {
    fn chip_id(&self) -> u16 {
        self.chip_id
    }

    fn read_memory(&self, address: u32, buf: &mut [u8]) {
        for (offset, byte) in buf.iter_mut().enumerate() {
            *byte = self.byte_at(address + offset as u32);
        }
    }
}

impl ControlTransfer for MockTarget {
    unsafe fn start(&mut self, handover: Handover) -> ! {
        self.log.borrow_mut().push(Event::Start(handover));
        std::panic::panic_any(Started(handover))
    }
}
