// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Single byte status codes carried in the payload of an ACK reply.

/// Declares a `repr(u8)` status enum with its wire conversions.
macro_rules! wire_status {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl From<$name> for u8 {
            fn from(status: $name) -> Self {
                status as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = u8;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    other => Err(other),
                }
            }
        }
    };
}

wire_status! {
    /// Outcome of the address check of a jump request.
    pub enum AddressStatus {
        Invalid = 0x00,
        Valid = 0x01,
    }
}

wire_status! {
    /// Outcome of a flash erase request.
    pub enum EraseStatus {
        /// Sector range outside the flash, nothing erased
        InvalidSector = 0x00,
        Unsuccessful = 0x02,
        Successful = 0x03,
    }
}

wire_status! {
    /// Outcome of a memory write request.
    pub enum WriteStatus {
        /// Invalid destination, or a half-word failed to program
        Failed = 0x00,
        Passed = 0x01,
    }
}

wire_status! {
    /// Flash read protection level.
    pub enum ProtectionLevel {
        /// No read protection
        Level0 = 0x00,
        /// Flash cannot be read through the debug port
        Level1 = 0x01,
    }
}

wire_status! {
    /// Outcome of a read protection change.
    /// `Failed` doubles as the neutral answer for an out-of-range level.
    pub enum ChangeStatus {
        Failed = 0x00,
        Successful = 0x01,
    }
}

wire_status! {
    /// Outcome of a sector write protection request.
    pub enum ProtectStatus {
        InvalidSector = 0x00,
        Successful = 0x01,
        Failed = 0x02,
    }
}

/// Bootloader identity reported by the version command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Version {
    pub id: u8,
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    pub const fn to_bytes(self) -> [u8; 4] {
        [self.id, self.major, self.minor, self.patch]
    }

    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            id: bytes[0],
            major: bytes[1],
            minor: bytes[2],
            patch: bytes[3],
        }
    }
}
