// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use consts::{BOOTLOADER_VERSION, BOOTLOADER_VERSION_ID};
use embedded_io::{Read, Write};
use host_protocol::{
    checksum, AddressStatus, ChangeStatus, Command, Frame, FrameError, Opcode, ProtectStatus,
    ProtectionLevel, Version, WriteStatus, HOST_BUFFER_SIZE, MAX_READ_LEN, REGISTRY,
};

use crate::error::read_error;
use crate::fmt::{debug, info, warn};
use crate::{address, flash, jump, protection, response};
use crate::{ControlTransfer, Error, Flash, OptionBytes, Target, Validation};

pub const VERSION: Version = Version {
    id: BOOTLOADER_VERSION_ID,
    major: BOOTLOADER_VERSION[0],
    minor: BOOTLOADER_VERSION[1],
    patch: BOOTLOADER_VERSION[2],
};

/// Everything a command may act on.
pub struct Device<C, F, O, T> {
    pub channel: C,
    pub flash: F,
    pub option_bytes: O,
    pub target: T,
}

/// Receive loop state: the device and the frame buffer.
pub struct Bootloader<C, F, O, T> {
    buffer: [u8; HOST_BUFFER_SIZE],
    device: Device<C, F, O, T>,
}

impl<C, F, O, T> Bootloader<C, F, O, T>
where
    C: Read + Write,
    F: Flash,
    O: OptionBytes,
    T: Target + ControlTransfer,
{
    pub fn new(device: Device<C, F, O, T>) -> Self {
        Self {
            buffer: [0; HOST_BUFFER_SIZE],
            device,
        }
    }

    pub fn device(&self) -> &Device<C, F, O, T> {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Device<C, F, O, T> {
        &mut self.device
    }

    /// Serves commands until one of them hands control over to other code.
    pub fn run(&mut self) -> ! {
        info!("bootloader {:?} ready", VERSION);
        loop {
            if let Err(error) = self.poll() {
                warn!("command failed: {:?}", error);
            }
        }
    }

    /// Receives and executes one command. Anything wrong with the frame is answered
    /// with a NACK; the returned error is for logging only.
    pub fn poll(&mut self) -> Result<(), Error> {
        let Self { buffer, device } = self;
        match receive(buffer, &mut device.channel) {
            Ok(command) => device.execute(command),
            Err(error) => {
                response::nack(&mut device.channel)?;
                Err(error)
            }
        }
    }
}

/// Reads one frame into `buffer` and decodes it. Frames that do not fit the buffer are
/// drained from the channel so the next cycle starts on a frame boundary.
fn receive<'a, C: Read>(
    buffer: &'a mut [u8; HOST_BUFFER_SIZE],
    channel: &mut C,
) -> Result<Command<'a>, Error> {
    buffer.fill(0);
    channel.read_exact(&mut buffer[..1]).map_err(read_error)?;

    let length = buffer[0] as usize;
    if 1 + length > HOST_BUFFER_SIZE {
        discard(channel, buffer, length)?;
        return Err(FrameError::TooLong(1 + length).into());
    }
    channel
        .read_exact(&mut buffer[1..1 + length])
        .map_err(read_error)?;

    let bytes: &'a [u8; HOST_BUFFER_SIZE] = buffer;
    let frame = Frame::parse(bytes)?;
    let opcode = frame.opcode()?;
    debug!("received {:?}, length {}", opcode, frame.length());

    let computed = checksum(frame.covered());
    if computed != frame.crc() {
        return Err(Error::Integrity {
            expected: frame.crc(),
            computed,
        });
    }
    Ok(Command::parse(opcode, frame.payload())?)
}

fn discard<C: Read>(channel: &mut C, scratch: &mut [u8], mut remaining: usize) -> Result<(), Error> {
    while remaining > 0 {
        let chunk = remaining.min(scratch.len());
        channel.read_exact(&mut scratch[..chunk]).map_err(read_error)?;
        remaining -= chunk;
    }
    Ok(())
}

impl<C, F, O, T> Device<C, F, O, T>
where
    C: Write,
    F: Flash,
    O: OptionBytes,
    T: Target + ControlTransfer,
{
    /// Runs a verified command and sends its reply.
    pub fn execute(&mut self, command: Command<'_>) -> Result<(), Error> {
        match command {
            Command::GetVersion => response::reply(&mut self.channel, &VERSION.to_bytes()),
            Command::GetHelp => response::reply(&mut self.channel, &REGISTRY),
            Command::GetChipId => {
                let id = self.target.chip_id();
                response::reply(&mut self.channel, &id.to_le_bytes())
            }
            Command::GetRdpStatus => {
                let level = protection::level(&self.option_bytes);
                response::reply(&mut self.channel, &[u8::from(level)])
            }
            Command::JumpToAddress { address } => self.jump(address),
            Command::EraseFlash { start_sector, count } => {
                response::ack(&mut self.channel, 1)?;
                let result = flash::erase(&mut self.flash, start_sector, count);
                let status = flash::erase_status(&result);
                response::payload(&mut self.channel, &[u8::from(status)])?;
                result
            }
            Command::MemoryWrite { address, data } => {
                response::ack(&mut self.channel, 1)?;
                let result = self.write(address, data);
                let status = match result {
                    Ok(()) => WriteStatus::Passed,
                    Err(_) => WriteStatus::Failed,
                };
                response::payload(&mut self.channel, &[u8::from(status)])?;
                result
            }
            Command::EnableRwProtect {
                start_sector,
                count,
            } => {
                response::ack(&mut self.channel, 1)?;
                let result = protection::enable_write_protection(
                    &mut self.flash,
                    &mut self.option_bytes,
                    start_sector,
                    count,
                );
                let status = match result {
                    Ok(()) => ProtectStatus::Successful,
                    Err(Error::Validation(_)) => ProtectStatus::InvalidSector,
                    Err(_) => ProtectStatus::Failed,
                };
                response::payload(&mut self.channel, &[u8::from(status)])?;
                self.apply_on_success(result)
            }
            Command::MemoryRead { address, len } => self.read(address, len),
            Command::ReadSectorStatus => {
                let states = protection::sector_states(&self.option_bytes);
                response::reply(&mut self.channel, &states)
            }
            Command::OtpRead => {
                response::nack(&mut self.channel)?;
                Err(Error::Unsupported(Opcode::OtpRead))
            }
            Command::ChangeRopLevel { level } => {
                response::ack(&mut self.channel, 1)?;
                let result =
                    protection::change_level(&mut self.flash, &mut self.option_bytes, level);
                let status = match result {
                    Ok(()) => ChangeStatus::Successful,
                    Err(_) => ChangeStatus::Failed,
                };
                response::payload(&mut self.channel, &[u8::from(status)])?;
                self.apply_on_success(result)
            }
        }
    }

    fn jump(&mut self, address: u32) -> Result<(), Error> {
        response::ack(&mut self.channel, 1)?;
        if !address::valid(address) {
            response::payload(&mut self.channel, &[u8::from(AddressStatus::Invalid)])?;
            return Err(Validation::Address(address).into());
        }
        response::payload(&mut self.channel, &[u8::from(AddressStatus::Valid)])?;
        jump::transfer(&mut self.target, address)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Error> {
        if address % 2 != 0 {
            return Err(Validation::Unaligned(address).into());
        }
        if !address::valid_range(address, flash::padded_len(data.len())) {
            return Err(Validation::Range {
                address,
                len: data.len(),
            }
            .into());
        }
        Ok(flash::write(&mut self.flash, address, data)?)
    }

    fn read(&mut self, address: u32, len: u8) -> Result<(), Error> {
        let mut reply = [0; 1 + MAX_READ_LEN as usize];
        let len = len as usize;
        match self.check_read(address, len) {
            Ok(()) => {
                reply[0] = AddressStatus::Valid.into();
                self.target.read_memory(address, &mut reply[1..=len]);
                response::reply(&mut self.channel, &reply[..=len])
            }
            Err(error) => {
                response::reply(&mut self.channel, &[u8::from(AddressStatus::Invalid)])?;
                Err(error)
            }
        }
    }

    fn check_read(&self, address: u32, len: usize) -> Result<(), Error> {
        if len == 0 || len > MAX_READ_LEN as usize {
            return Err(Validation::ReadLength(len as u8).into());
        }
        if !address::valid_range(address, len) {
            return Err(Validation::Range { address, len }.into());
        }
        if address::FLASH.overlaps(address, len)
            && protection::level(&self.option_bytes) == ProtectionLevel::Level1
        {
            return Err(Validation::ReadProtected(address).into());
        }
        Ok(())
    }

    /// Reloads the option bytes once a protection change has been reported.
    fn apply_on_success(&mut self, result: Result<(), Error>) -> Result<(), Error> {
        if result.is_ok() {
            info!("reloading option bytes");
            self.option_bytes.launch();
        }
        result
    }
}
