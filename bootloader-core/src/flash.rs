// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sector erase and half-word programming of the main flash.

use consts::{ERASE_ALL_SECTORS, FLASH_PAGE, FLASH_START, MAX_SECTORS, PAGES_PER_SECTOR};
use host_protocol::EraseStatus;

use crate::fmt::{debug, info};
use crate::guard::Unlocked;
use crate::{Error, Flash, FlashError, Validation};

/// Pages covered by a sector request, or `None` when it runs past the last sector.
pub fn sector_pages(start_sector: u8, count: u8) -> Option<(u32, u32)> {
    if start_sector as u16 + count as u16 > MAX_SECTORS as u16 {
        return None;
    }
    let address = FLASH_START + start_sector as u32 * PAGES_PER_SECTOR * FLASH_PAGE;
    Some((address, count as u32 * PAGES_PER_SECTOR))
}

/// Erases `count` sectors from `start_sector`, or the whole flash when `count` is
/// [`ERASE_ALL_SECTORS`]. The controller is locked again on every path.
pub fn erase<F: Flash>(flash: &mut F, start_sector: u8, count: u8) -> Result<(), Error> {
    if count == ERASE_ALL_SECTORS {
        info!("mass erase");
        let mut flash = Unlocked::new(flash)?;
        return Ok(flash.mass_erase()?);
    }

    let (address, pages) = sector_pages(start_sector, count)
        .ok_or(Validation::Sectors { start: start_sector, count })?;
    if pages == 0 {
        return Ok(());
    }

    info!("erasing {} pages from {:#x}", pages, address);
    let mut flash = Unlocked::new(flash)?;
    Ok(flash.erase_pages(address, pages)?)
}

/// Status byte reported for the outcome of [`erase`].
pub fn erase_status(result: &Result<(), Error>) -> EraseStatus {
    match result {
        Ok(()) => EraseStatus::Successful,
        Err(Error::Validation(_)) => EraseStatus::InvalidSector,
        Err(_) => EraseStatus::Unsuccessful,
    }
}

/// Programs `data` at `address` one little-endian half-word at a time. An odd trailing
/// byte is paired with 0xFF, the erased state. Stops at the first failing half-word.
///
/// The caller validates the destination range.
pub fn write<F: Flash>(flash: &mut F, address: u32, data: &[u8]) -> Result<(), FlashError> {
    if address % 2 != 0 {
        return Err(FlashError::Program(address));
    }
    let mut flash = Unlocked::new(flash)?;
    let mut cursor = address;
    for unit in data.chunks(2) {
        let value = u16::from_le_bytes([unit[0], unit.get(1).copied().unwrap_or(0xFF)]);
        flash.program_half_word(cursor, value)?;
        cursor += 2;
    }
    debug!("programmed {} bytes at {:#x}", data.len(), address);
    Ok(())
}

/// Number of flash bytes touched when writing `len` bytes.
pub const fn padded_len(len: usize) -> usize {
    len + len % 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Event, MockFlash};

    #[test]
    fn sector_to_pages() {
        assert_eq!(sector_pages(0, 1), Some((0x0800_0000, 16)));
        assert_eq!(sector_pages(2, 2), Some((0x0800_8000, 32)));
        assert_eq!(sector_pages(3, 1), Some((0x0800_C000, 16)));
        assert_eq!(sector_pages(4, 0), Some((0x0801_0000, 0)));
        assert_eq!(sector_pages(3, 2), None);
        assert_eq!(sector_pages(0xFF, 0xFE), None);
    }

    #[test]
    fn sector_requests_over_whole_range() {
        for start in 0..=u8::MAX {
            for count in 0..=u8::MAX {
                let mut flash = MockFlash::default();
                let result = erase(&mut flash, start, count);
                let status = erase_status(&result);
                let events = flash.log.borrow().clone();
                if count == ERASE_ALL_SECTORS {
                    assert_eq!(status, EraseStatus::Successful);
                    assert!(events.contains(&Event::MassErase));
                } else if start as u16 + count as u16 > MAX_SECTORS as u16 {
                    assert_eq!(status, EraseStatus::InvalidSector, "{start} {count}");
                    assert!(events.is_empty());
                } else {
                    assert_eq!(status, EraseStatus::Successful, "{start} {count}");
                }
            }
        }
    }

    #[test]
    fn empty_erase_does_not_touch_flash() {
        let mut flash = MockFlash::default();
        assert_eq!(erase(&mut flash, 2, 0), Ok(()));
        assert!(flash.log.borrow().is_empty());
    }

    #[test]
    fn erase_failure_still_locks() {
        let mut flash = MockFlash {
            fail_erase: true,
            ..Default::default()
        };
        let result = erase(&mut flash, 1, 1);
        assert_eq!(erase_status(&result), EraseStatus::Unsuccessful);
        assert_eq!(
            *flash.log.borrow(),
            [
                Event::FlashUnlock,
                Event::ErasePages {
                    address: 0x0800_4000,
                    pages: 16
                },
                Event::FlashLock,
            ]
        );
    }

    #[test]
    fn failed_unlock_relocks_without_erasing() {
        let mut flash = MockFlash {
            fail_unlock: true,
            ..Default::default()
        };
        let result = erase(&mut flash, 0, 1);
        assert_eq!(result, Err(Error::Operation(FlashError::Unlock)));
        assert_eq!(*flash.log.borrow(), [Event::FlashUnlock, Event::FlashLock]);
    }

    #[test]
    fn odd_length_pads_with_erased_byte() {
        let mut flash = MockFlash::default();
        write(&mut flash, 0x0800_8000, &[0x11, 0x22, 0x33]).unwrap();
        assert_eq!(
            *flash.log.borrow(),
            [
                Event::FlashUnlock,
                Event::Program {
                    address: 0x0800_8000,
                    value: 0x2211
                },
                Event::Program {
                    address: 0x0800_8002,
                    value: 0xFF33
                },
                Event::FlashLock,
            ]
        );
        assert_eq!(padded_len(3), 4);
        assert_eq!(padded_len(4), 4);
    }

    #[test]
    fn write_stops_at_first_failure() {
        let mut flash = MockFlash {
            fail_program_at: Some(0x0800_8002),
            ..Default::default()
        };
        let result = write(&mut flash, 0x0800_8000, &[0; 8]);
        assert_eq!(result, Err(FlashError::Program(0x0800_8002)));
        let programmed = flash
            .log
            .borrow()
            .iter()
            .filter(|event| matches!(event, Event::Program { .. }))
            .count();
        assert_eq!(programmed, 2);
        assert_eq!(flash.log.borrow().last(), Some(&Event::FlashLock));
    }

    #[test]
    fn odd_destination_is_not_programmed() {
        let mut flash = MockFlash::default();
        assert_eq!(
            write(&mut flash, 0x0800_8001, &[0x11, 0x22]),
            Err(FlashError::Program(0x0800_8001))
        );
        assert!(flash.log.borrow().is_empty());
    }
}
