// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Logging shim: defmt on target, the `log` facade on the host (and in tests), or
//! nothing at all.
//! Format strings stick to `{}`, `{:?}` and `{:#x}` so they are valid for both backends.

#![allow(unused_imports)]

#[cfg(feature = "defmt")]
pub(crate) use defmt::{debug, error, info, warn};

#[cfg(all(any(feature = "log", test), not(feature = "defmt")))]
pub(crate) use log::{debug, error, info, warn};

#[cfg(not(any(feature = "log", feature = "defmt", test)))]
mod silent {
    macro_rules! silent {
        ($($arg:expr),* $(,)?) => {{
            $(let _ = &$arg;)*
        }};
    }

    pub(crate) use silent as debug;
    pub(crate) use silent as error;
    pub(crate) use silent as info;
    pub(crate) use silent as warn;
}

#[cfg(not(any(feature = "log", feature = "defmt", test)))]
pub(crate) use silent::{debug, error, info, warn};
