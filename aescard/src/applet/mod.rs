// Copyright 2017 Axel Rasmussen
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod apdu;
pub mod hal;
pub mod handle;
pub mod recording;
pub mod scarderr;
pub mod sw;
pub mod util;

pub use self::hal::{PcscHal, PcscHardware};
pub use self::handle::{Exchange, Handle, State};

use std::fmt;

/// The default reader string to use. The first reader (as returned by list_readers) which contains
/// this string as a substring is the one which will be used. So, an empty string matches the
/// first reader the system reports.
pub const DEFAULT_READER: &'static str = "";

/// The Application ID the AES applet was installed with.
pub const APPLET_AID: [u8; 6] = [0xae, 0x25, 0x6c, 0xbc, 0x00, 0x01];

/// The proprietary instruction class the applet accepts for its own commands.
pub const CLA_PROPRIETARY: u8 = 0x80;

/// The AES block size. The applet runs CBC without padding, so every message it
/// sees must be a multiple of this length.
pub const BLOCK_BYTES: usize = 16;

/// The number of bytes in an AES-256 key.
pub const KEY_BYTES: usize = 32;

/// The number of bytes in a CBC initialization vector.
pub const IV_BYTES: usize = BLOCK_BYTES;

/// The largest message the applet can encrypt or decrypt in a single APDU: the
/// biggest multiple of BLOCK_BYTES which fits in a one-byte LC.
pub const MAX_CHUNK_BYTES: usize = (u8::MAX as usize / BLOCK_BYTES) * BLOCK_BYTES;

/// The commands this crate knows how to send.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Instruction {
    Select,
    SetKey,
    SetIv,
    Encrypt,
    Decrypt,
    GetResponse,
}

impl Instruction {
    /// The instruction class byte this command is sent with.
    pub fn cla(&self) -> u8 {
        match self {
            Instruction::Select | Instruction::GetResponse => 0x00,
            _ => CLA_PROPRIETARY,
        }
    }

    /// The instruction code byte.
    pub fn ins(&self) -> u8 {
        match self {
            Instruction::Select => 0xa4,
            Instruction::SetKey => 0x10,
            Instruction::SetIv => 0x11,
            Instruction::Encrypt => 0x20,
            Instruction::Decrypt => 0x30,
            Instruction::GetResponse => 0xc0,
        }
    }

    /// The first parameter byte. Only SELECT uses it, to select by AID.
    pub fn p1(&self) -> u8 {
        match self {
            Instruction::Select => 0x04,
            _ => 0x00,
        }
    }

    pub fn from_bytes(cla: u8, ins: u8) -> Option<Self> {
        [
            Instruction::Select,
            Instruction::SetKey,
            Instruction::SetIv,
            Instruction::Encrypt,
            Instruction::Decrypt,
            Instruction::GetResponse,
        ]
        .into_iter()
        .find(|i| i.cla() == cla && i.ins() == ins)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Instruction::Select => "SELECT",
                Instruction::SetKey => "SET_KEY",
                Instruction::SetIv => "SET_IV",
                Instruction::Encrypt => "ENCRYPT",
                Instruction::Decrypt => "DECRYPT",
                Instruction::GetResponse => "GET_RESPONSE",
            }
        )
    }
}
