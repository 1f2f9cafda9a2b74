// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Read and write protection through the option bytes.
//!
//! Both changes need the flash controller and the option byte controller unlocked, in
//! that order. Locks are released in reverse order whatever the outcome, and nothing
//! is programmed unless both unlocks succeeded. New values only become effective once
//! the option bytes are reloaded, which the caller does after reporting the status.

use consts::{MAX_SECTORS, PAGES_PER_SECTOR, PAGES_PER_WRP_GROUP};
use host_protocol::ProtectionLevel;

use crate::fmt::info;
use crate::guard::Unlocked;
use crate::{Error, Flash, OptionBytes, Validation};

/// Read protection byte value meaning "not protected".
pub const RDP_LEVEL0_KEY: u8 = 0xA5;

/// Value programmed to enter read protection level 1.
pub const RDP_LEVEL1_KEY: u8 = 0x00;

const GROUPS_PER_SECTOR: u32 = PAGES_PER_SECTOR / PAGES_PER_WRP_GROUP;

/// Current read protection level.
pub fn level<O: OptionBytes>(option_bytes: &O) -> ProtectionLevel {
    match option_bytes.read_protection() {
        RDP_LEVEL0_KEY => ProtectionLevel::Level0,
        _ => ProtectionLevel::Level1,
    }
}

/// Programs the read protection level. Levels other than 0 and 1 are refused
/// before any controller is unlocked.
pub fn change_level<F, O>(flash: &mut F, option_bytes: &mut O, level: u8) -> Result<(), Error>
where
    F: Flash,
    O: OptionBytes,
{
    let level = ProtectionLevel::try_from(level).map_err(Validation::Level)?;
    let key = match level {
        ProtectionLevel::Level0 => RDP_LEVEL0_KEY,
        ProtectionLevel::Level1 => RDP_LEVEL1_KEY,
    };

    info!("changing read protection to {:?}", level);
    let _flash = Unlocked::new(flash)?;
    let mut option_bytes = Unlocked::new(option_bytes)?;
    option_bytes.program_read_protection(key)?;
    Ok(())
}

/// Write protection group mask for a sector range.
pub fn sector_groups(start_sector: u8, count: u8) -> Option<u32> {
    if count == 0 || start_sector as u16 + count as u16 > MAX_SECTORS as u16 {
        return None;
    }
    let width = count as u32 * GROUPS_PER_SECTOR;
    let mask = 1u32.checked_shl(width).map_or(u32::MAX, |bit| bit - 1);
    Some(mask << (start_sector as u32 * GROUPS_PER_SECTOR))
}

/// Write protects `count` sectors from `start_sector`.
pub fn enable_write_protection<F, O>(
    flash: &mut F,
    option_bytes: &mut O,
    start_sector: u8,
    count: u8,
) -> Result<(), Error>
where
    F: Flash,
    O: OptionBytes,
{
    let groups = sector_groups(start_sector, count)
        .ok_or(Validation::Sectors { start: start_sector, count })?;

    info!("write protecting groups {:#x}", groups);
    let _flash = Unlocked::new(flash)?;
    let mut option_bytes = Unlocked::new(option_bytes)?;
    option_bytes.program_write_protection(groups)?;
    Ok(())
}

/// One byte per sector, 1 when any of its page groups is write protected.
pub fn sector_states<O: OptionBytes>(option_bytes: &O) -> [u8; MAX_SECTORS as usize] {
    let protected = option_bytes.write_protection();
    let mut states = [0; MAX_SECTORS as usize];
    for (sector, state) in states.iter_mut().enumerate() {
        if let Some(groups) = sector_groups(sector as u8, 1) {
            *state = u8::from(protected & groups != 0);
        }
    }
    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Event, MockFlash, MockOptionBytes};
    use crate::FlashError;

    #[test]
    fn vendor_key_means_unprotected() {
        let mut option_bytes = MockOptionBytes::default();
        assert_eq!(level(&option_bytes), ProtectionLevel::Level0);
        for raw in [0x00, 0x01, 0x5A, 0xFF] {
            option_bytes.rdp = raw;
            assert_eq!(level(&option_bytes), ProtectionLevel::Level1);
        }
    }

    #[test]
    fn invalid_level_never_unlocks() {
        let mut flash = MockFlash::default();
        let mut option_bytes = MockOptionBytes::with_log(flash.log.clone());
        let result = change_level(&mut flash, &mut option_bytes, 2);
        assert_eq!(result, Err(Error::Validation(Validation::Level(2))));
        assert!(flash.log.borrow().is_empty());
    }

    #[test]
    fn level_change_unlocks_both_and_relocks() {
        let mut flash = MockFlash::default();
        let mut option_bytes = MockOptionBytes::with_log(flash.log.clone());
        change_level(&mut flash, &mut option_bytes, 1).unwrap();
        assert_eq!(
            *flash.log.borrow(),
            [
                Event::FlashUnlock,
                Event::OptionUnlock,
                Event::ProgramReadProtection(RDP_LEVEL1_KEY),
                Event::OptionLock,
                Event::FlashLock,
            ]
        );
    }

    #[test]
    fn option_unlock_failure_programs_nothing() {
        let mut flash = MockFlash::default();
        let mut option_bytes = MockOptionBytes {
            fail_unlock: true,
            ..MockOptionBytes::with_log(flash.log.clone())
        };
        let result = change_level(&mut flash, &mut option_bytes, 0);
        assert_eq!(result, Err(Error::Operation(FlashError::Unlock)));
        assert_eq!(
            *flash.log.borrow(),
            [
                Event::FlashUnlock,
                Event::OptionUnlock,
                Event::OptionLock,
                Event::FlashLock,
            ]
        );
    }

    #[test]
    fn group_masks() {
        assert_eq!(sector_groups(0, 1), Some(0x000F));
        assert_eq!(sector_groups(1, 2), Some(0x0FF0));
        assert_eq!(sector_groups(0, 4), Some(0xFFFF));
        assert_eq!(sector_groups(3, 1), Some(0xF000));
        assert_eq!(sector_groups(0, 0), None);
        assert_eq!(sector_groups(2, 3), None);
    }

    #[test]
    fn write_protection_rejects_bad_range() {
        let mut flash = MockFlash::default();
        let mut option_bytes = MockOptionBytes::with_log(flash.log.clone());
        let result = enable_write_protection(&mut flash, &mut option_bytes, 3, 2);
        assert_eq!(
            result,
            Err(Error::Validation(Validation::Sectors { start: 3, count: 2 }))
        );
        assert!(flash.log.borrow().is_empty());
    }

    #[test]
    fn any_protected_group_marks_sector() {
        let option_bytes = MockOptionBytes {
            wrp: 0b0001_0000_0000_1000_0000,
            ..Default::default()
        };
        assert_eq!(sector_states(&option_bytes), [0, 1, 0, 0]);

        let option_bytes = MockOptionBytes {
            wrp: 0xF00F,
            ..Default::default()
        };
        assert_eq!(sector_states(&option_bytes), [1, 0, 0, 1]);
    }
}
