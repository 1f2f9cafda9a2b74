// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use clap::{Parser, Subcommand};
use consts::{BASE_APP_ADDR, BOOTLOADER_SIZE, FLASH_PAGE, MAX_SECTORS, PAGES_PER_SECTOR};
use host_protocol::{
    AddressStatus, ChangeStatus, Command, EraseStatus, ProtectStatus, ProtectionLevel, Reply, Version,
    WriteStatus, ACK, MAX_READ_LEN,
};
use log::{debug, info, warn};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Bytes per write frame; even so every chunk after the first stays half-word aligned.
const CHUNK_SIZE: usize = 128;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

fn parse_u32(value: &str) -> Result<u32, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("{value}: {e}"))
}

#[derive(Clone, Debug, Subcommand)]
enum Action {
    /// Bootloader version
    Version,
    /// Opcodes supported by the bootloader
    Help,
    /// MCU device identifier
    ChipId,
    /// Read protection level
    Rdp,
    /// Leave the bootloader; the application base starts the application
    Jump {
        #[arg(value_parser = parse_u32, default_value_t = BASE_APP_ADDR)]
        address: u32,
    },
    /// Erase sectors, or the whole flash with count 255
    Erase { start_sector: u8, count: u8 },
    /// Write a binary file to memory
    Write {
        #[arg(value_parser = parse_u32)]
        address: u32,
        file: PathBuf,
    },
    /// Erase the application sectors, write an image there and start it
    Flash {
        file: PathBuf,
        #[arg(long)]
        no_jump: bool,
    },
    /// Hex dump of a memory block
    Read {
        #[arg(value_parser = parse_u32)]
        address: u32,
        #[arg(default_value_t = 64)]
        len: u32,
    },
    /// Write protection state of every sector
    SectorStatus,
    /// One-time-programmable area
    Otp,
    /// Change the read protection level (0 or 1)
    SetRdp { level: u8 },
    /// Write protect sectors
    Protect { start_sector: u8, count: u8 },
}

#[derive(Debug, Parser)]
struct Args {
    #[arg(short, long)]
    list_ports: bool,
    #[arg(short, long, default_value_t = String::from("/dev/ttyUSB0"))]
    port: String,
    #[arg(short, long, default_value_t = 115200)]
    baudrate: u32,
    #[command(subcommand)]
    action: Option<Action>,
}

/// Sends one command frame and collects the reply. `None` for a NACK.
async fn transact(serial: &mut SerialStream, command: Command<'_>) -> Result<Option<Vec<u8>>, Box<dyn Error>> {
    let frame = command.to_frame()?;
    debug!(">> {:02x?}", frame.as_slice());
    serial.write_all(&frame).await?;
    serial.flush().await?;

    let mut reply = vec![0; 2];
    tokio::time::timeout(REPLY_TIMEOUT, serial.read_exact(&mut reply[..1])).await??;
    let remaining = if reply[0] == ACK {
        tokio::time::timeout(REPLY_TIMEOUT, serial.read_exact(&mut reply[1..2])).await??;
        Reply::remaining_after(&reply)?
    } else {
        reply.truncate(1);
        Reply::remaining_after(&reply)?
    };
    let start = reply.len();
    reply.resize(start + remaining, 0);
    tokio::time::timeout(REPLY_TIMEOUT, serial.read_exact(&mut reply[start..])).await??;
    debug!("<< {:02x?}", reply);

    match Reply::parse(&reply)? {
        Reply::Ack(payload) => Ok(Some(payload.to_vec())),
        Reply::Nack => Ok(None),
    }
}

/// Runs a command whose reply is a single status byte.
async fn status<T: TryFrom<u8>>(serial: &mut SerialStream, command: Command<'_>) -> Result<Option<T>, Box<dyn Error>> {
    let Some(payload) = transact(serial, command).await? else {
        return Ok(None);
    };
    let byte = *payload.first().ok_or("empty status reply")?;
    Ok(Some(T::try_from(byte).map_err(|_| format!("unknown status {byte:#04x}"))?))
}

async fn write_file(serial: &mut SerialStream, address: u32, file: &PathBuf) -> Result<bool, Box<dyn Error>> {
    let image = std::fs::read(file)?;
    info!("writing {} bytes at {:#010x}", image.len(), address);
    for (index, chunk) in image.chunks(CHUNK_SIZE).enumerate() {
        let chunk_address = address + (index * CHUNK_SIZE) as u32;
        let command = Command::MemoryWrite {
            address: chunk_address,
            data: chunk,
        };
        match status::<WriteStatus>(serial, command).await? {
            Some(WriteStatus::Passed) => debug!("chunk {index} written at {chunk_address:#010x}"),
            Some(WriteStatus::Failed) => {
                println!("Write failed at {chunk_address:#010x}");
                return Ok(false);
            }
            None => {
                println!("Chunk {index} rejected");
                return Ok(false);
            }
        }
    }
    println!("Wrote {} bytes", image.len());
    Ok(true)
}

fn hex_dump(address: u32, data: &[u8]) {
    for (index, line) in data.chunks(16).enumerate() {
        println!("{:08x}: {:02x?}", address as usize + index * 16, line);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    let args = Args::parse();

    if args.list_ports {
        let ports = tokio_serial::available_ports()?;
        println!("List of available serial ports:");
        for port in ports {
            println!("- {}", port.port_name);
        }
        return Ok(());
    }

    let Some(action) = args.action else {
        println!("Choose a command to be send.");
        return Ok(());
    };

    let mut serial = tokio_serial::new(&args.port, args.baudrate).open_native_async()?;

    match action {
        Action::Version => match transact(&mut serial, Command::GetVersion).await? {
            Some(payload) if payload.len() == 4 => {
                let version = Version::from_bytes([payload[0], payload[1], payload[2], payload[3]]);
                println!(
                    "Bootloader {} version {}.{}.{}",
                    version.id, version.major, version.minor, version.patch
                );
            }
            other => println!("Unexpected reply {other:02x?}"),
        },
        Action::Help => {
            if let Some(opcodes) = transact(&mut serial, Command::GetHelp).await? {
                println!("Supported opcodes: {opcodes:02x?}");
            }
        }
        Action::ChipId => match transact(&mut serial, Command::GetChipId).await?.as_deref() {
            Some(&[low, high]) => println!("Chip id: {:#05x}", u16::from_le_bytes([low, high])),
            other => println!("Unexpected reply {other:02x?}"),
        },
        Action::Rdp => match status::<ProtectionLevel>(&mut serial, Command::GetRdpStatus).await? {
            Some(level) => println!("Read protection: {level:?}"),
            None => println!("Not acknowledged"),
        },
        Action::Jump { address } => {
            match status::<AddressStatus>(&mut serial, Command::JumpToAddress { address }).await? {
                Some(AddressStatus::Valid) => println!("Jumped to {address:#010x}"),
                Some(AddressStatus::Invalid) => println!("Address {address:#010x} refused"),
                None => println!("Not acknowledged"),
            }
        }
        Action::Erase { start_sector, count } => {
            let result = status::<EraseStatus>(&mut serial, Command::EraseFlash { start_sector, count }).await?;
            println!("Erase: {result:?}");
        }
        Action::Write { address, file } => {
            write_file(&mut serial, address, &file).await?;
        }
        Action::Flash { file, no_jump } => {
            let start_sector = (BOOTLOADER_SIZE / (FLASH_PAGE * PAGES_PER_SECTOR)) as u8;
            let command = Command::EraseFlash {
                start_sector,
                count: MAX_SECTORS - start_sector,
            };
            if status::<EraseStatus>(&mut serial, command).await? != Some(EraseStatus::Successful) {
                warn!("application erase failed");
                return Ok(());
            }
            if write_file(&mut serial, BASE_APP_ADDR, &file).await? && !no_jump {
                let command = Command::JumpToAddress { address: BASE_APP_ADDR };
                let result = status::<AddressStatus>(&mut serial, command).await?;
                println!("Application start: {result:?}");
            }
        }
        Action::Read { address, len } => {
            let mut data = Vec::new();
            while data.len() < len as usize {
                let block_address = address + data.len() as u32;
                let block = (len as usize - data.len()).min(MAX_READ_LEN as usize) as u8;
                let command = Command::MemoryRead {
                    address: block_address,
                    len: block,
                };
                match transact(&mut serial, command).await? {
                    Some(payload) if payload.first() == Some(&u8::from(AddressStatus::Valid)) => {
                        data.extend_from_slice(&payload[1..]);
                    }
                    _ => {
                        println!("Read refused at {block_address:#010x}");
                        break;
                    }
                }
            }
            hex_dump(address, &data);
        }
        Action::SectorStatus => {
            if let Some(states) = transact(&mut serial, Command::ReadSectorStatus).await? {
                for (sector, state) in states.iter().enumerate() {
                    let state = if *state == 0 { "writable" } else { "write protected" };
                    println!("Sector {sector}: {state}");
                }
            }
        }
        Action::Otp => match transact(&mut serial, Command::OtpRead).await? {
            Some(otp) => hex_dump(0, &otp),
            None => println!("OTP read not supported by this device"),
        },
        Action::SetRdp { level } => {
            let result = status::<ChangeStatus>(&mut serial, Command::ChangeRopLevel { level }).await?;
            println!("Read protection change: {result:?}");
        }
        Action::Protect { start_sector, count } => {
            let command = Command::EnableRwProtect { start_sector, count };
            let result = status::<ProtectStatus>(&mut serial, command).await?;
            println!("Write protection: {result:?}");
        }
    }

    Ok(())
}
