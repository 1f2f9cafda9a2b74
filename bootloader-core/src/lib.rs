// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command engine of the serial bootloader.
//!
//! The engine receives one length-prefixed frame at a time from the host, checks its CRC,
//! decodes it into a [`host_protocol::Command`] and executes it against the hardware
//! traits in [`interfaces`]. Board crates provide the byte channel (any
//! `embedded_io::Read + Write`), the flash and option byte primitives and the
//! control transfer primitive; everything else lives here and runs on the host in tests.

#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod address;
mod bootloader;
mod error;
pub mod flash;
mod guard;
pub mod interfaces;
pub mod jump;
pub mod protection;
pub mod response;

#[cfg(test)]
mod mock;

pub use bootloader::{Bootloader, Device};
pub use error::{Error, FlashError, Validation};
pub use interfaces::{Controller, ControlTransfer, Flash, OptionBytes, Target};
pub use jump::Handover;
