// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

/// Command opcodes understood by the bootloader.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// Read the bootloader version
    GetVersion = 0x10,
    /// Read the list of supported opcodes
    GetHelp = 0x11,
    /// Read the MCU device identifier
    GetChipId = 0x12,
    /// Read the flash read protection level
    GetRdpStatus = 0x13,
    /// Jump to an address, or hand over to the application
    JumpToAddress = 0x14,
    /// Erase flash sectors, or the whole flash
    EraseFlash = 0x15,
    /// Program a block of memory
    MemoryWrite = 0x16,
    /// Enable write protection on flash sectors
    EnableRwProtect = 0x17,
    /// Read a block of memory
    MemoryRead = 0x18,
    /// Read the write protection state of every sector
    ReadSectorStatus = 0x19,
    /// Read the one-time-programmable area
    OtpRead = 0x20,
    /// Change the flash read protection level
    ChangeRopLevel = 0x21,
}

/// Every supported opcode, in the order reported by [`Opcode::GetHelp`].
pub const SUPPORTED_COMMANDS: [Opcode; 12] = [
    Opcode::GetVersion,
    Opcode::GetHelp,
    Opcode::GetChipId,
    Opcode::GetRdpStatus,
    Opcode::JumpToAddress,
    Opcode::EraseFlash,
    Opcode::MemoryWrite,
    Opcode::EnableRwProtect,
    Opcode::MemoryRead,
    Opcode::ReadSectorStatus,
    Opcode::OtpRead,
    Opcode::ChangeRopLevel,
];

/// Wire image of [`SUPPORTED_COMMANDS`].
pub const REGISTRY: [u8; SUPPORTED_COMMANDS.len()] = {
    let mut out = [0; SUPPORTED_COMMANDS.len()];
    let mut i = 0;
    while i < SUPPORTED_COMMANDS.len() {
        out[i] = SUPPORTED_COMMANDS[i] as u8;
        i += 1;
    }
    out
};

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        SUPPORTED_COMMANDS
            .iter()
            .copied()
            .find(|opcode| *opcode as u8 == value)
            .ok_or(value)
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> Self {
        opcode as u8
    }
}
