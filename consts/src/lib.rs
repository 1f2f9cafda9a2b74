// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Memory map, flash geometry and version of the serial bootloader.
//! Shared by the bootloader engine, the board crate's build script and the host tool.

#![no_std]

/// Start of the on-chip SRAM.
pub const SRAM_START: u32 = 0x2000_0000;

/// Size of the on-chip SRAM (20KB on the STM32F103x8).
pub const SRAM_SIZE: u32 = 20 * 1024;

/// Last valid SRAM address (inclusive).
pub const SRAM_END: u32 = SRAM_START + SRAM_SIZE - 1;

/// Start of the main flash memory.
pub const FLASH_START: u32 = 0x0800_0000;

/// Size of the main flash memory (64KB).
pub const FLASH_SIZE: u32 = 64 * 1024;

/// Last valid flash address (inclusive).
pub const FLASH_END: u32 = FLASH_START + FLASH_SIZE - 1;

/// Size reserved for the bootloader itself at the start of flash (32KB).
pub const BOOTLOADER_SIZE: u32 = 0x8000;

/// Base address of the application in flash memory.
/// The first two words hold the application's initial stack pointer and reset vector.
/// A jump request to exactly this address hands control over to the application.
pub const BASE_APP_ADDR: u32 = FLASH_START + BOOTLOADER_SIZE;

/// Size of a flash page in bytes (1KB), the smallest erasable unit.
pub const FLASH_PAGE: u32 = 1024;

/// Number of pages grouped into one erase sector.
pub const PAGES_PER_SECTOR: u32 = 16;

/// Number of sectors addressable by the erase command.
pub const MAX_SECTORS: u8 = 4;

/// Sector count value requesting a mass erase of the whole flash.
pub const ERASE_ALL_SECTORS: u8 = 0xFF;

/// Number of pages covered by one write-protection bit in the option bytes.
pub const PAGES_PER_WRP_GROUP: u32 = 4;

/// Start address of the option bytes block.
pub const OPTION_BYTES_ADDR: u32 = 0x1FFF_F800;

/// Bootloader identifier reported by the version command.
pub const BOOTLOADER_VERSION_ID: u8 = 100;

/// Bootloader software version, reported as `[id, major, minor, patch]`.
pub const BOOTLOADER_VERSION: [u8; 3] = [1, 0, 0];
