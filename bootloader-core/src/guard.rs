// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use core::ops::{Deref, DerefMut};

use crate::fmt::warn;
use crate::{Controller, FlashError};

/// Unlocked controller, locked again when dropped.
pub(crate) struct Unlocked<'a, C: Controller> {
    controller: &'a mut C,
}

impl<'a, C: Controller> Unlocked<'a, C> {
    pub(crate) fn new(controller: &'a mut C) -> Result<Self, FlashError> {
        if let Err(error) = controller.unlock() {
            warn!("unlock failed: {:?}", error);
            controller.lock();
            return Err(error);
        }
        Ok(Self { controller })
    }
}

impl<C: Controller> Deref for Unlocked<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.controller
    }
}

impl<C: Controller> DerefMut for Unlocked<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.controller
    }
}

impl<C: Controller> Drop for Unlocked<'_, C> {
    fn drop(&mut self) {
        self.controller.lock();
    }
}
