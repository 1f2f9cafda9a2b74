// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Renders `memory.x` from the shared memory map into a directory where the linker
//! can always find it, so the bootloader can never grow into the application area.

use consts::{BOOTLOADER_SIZE, FLASH_START, SRAM_SIZE, SRAM_START};
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() {
    let memory_x_content = format!(
        r##"
        MEMORY
        {{
            /* NOTE 1 K = 1 KiBi = 1024 bytes */
            /* The bootloader owns the first {bootloader_kib}K of flash, the application follows */
            FLASH (rx) : ORIGIN = {FLASH_START:#X}, LENGTH = {BOOTLOADER_SIZE:#X}
            RAM (rwx) : ORIGIN = {SRAM_START:#X}, LENGTH = {SRAM_SIZE:#X}
        }}
        "##,
        bootloader_kib = BOOTLOADER_SIZE / 1024,
    );
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(memory_x_content.as_bytes())
        .unwrap();
    println!("cargo:rustc-link-search={}", out.display());

    // Only the shared constants shape the linker script.
    println!("cargo:rerun-if-changed=../consts/src/lib.rs");
    println!("cargo:rerun-if-changed=build.rs");

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
