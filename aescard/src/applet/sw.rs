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

use crate::applet::Instruction;
use crate::error::*;
use serde::de::{Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, Serializer};
use std::fmt;

/// The two-byte status word a card appends to every response.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct StatusWord {
    pub value: u16,
    pub bytes_remaining: Option<usize>,
}

impl StatusWord {
    pub fn new_from_value(value: u16) -> StatusWord {
        // 61xx means the command succeeded, but xx bytes of response are still
        // waiting to be fetched with GET RESPONSE.
        let bytes_remaining: Option<usize> = if value & 0xff00 == 0x6100 {
            Some((value & 0xff) as usize)
        } else {
            None
        };

        StatusWord {
            value: value,
            bytes_remaining: bytes_remaining,
        }
    }

    pub fn new_from_bytes(sw1: u8, sw2: u8) -> StatusWord {
        StatusWord::new_from_value(((sw1 as u16) << 8) | (sw2 as u16))
    }

    /// Parse the status word out of the last two bytes of a raw response. A
    /// response too short to contain one is treated as status 0x0000, which
    /// is never a success.
    pub fn new(buffer: &[u8]) -> StatusWord {
        let length = buffer.len();
        if length >= 2 {
            StatusWord::new_from_bytes(buffer[length - 2], buffer[length - 1])
        } else {
            StatusWord::new_from_value(0)
        }
    }

    pub fn success() -> StatusWord {
        StatusWord::new_from_value(0x9000)
    }

    pub fn sw1(&self) -> u8 {
        (self.value >> 8) as u8
    }

    pub fn sw2(&self) -> u8 {
        (self.value & 0xff) as u8
    }

    pub fn is_success(&self) -> bool {
        self.value == 0x9000
    }

    /// Turn this status word into a Result, attributing any failure to the
    /// given instruction.
    pub fn check(&self, instruction: Instruction) -> Result<()> {
        if self.is_success() {
            return Ok(());
        }
        Err(Error::CommandFailed {
            instruction: instruction,
            sw1: self.sw1(),
            sw2: self.sw2(),
        })
    }

    /// A human-readable explanation of this status word, per ISO 7816-4. The
    /// applet itself only ever returns a handful of these (wrong length,
    /// unsupported CLA / INS, function not supported).
    pub fn description(&self) -> &'static str {
        if self.bytes_remaining.is_some() {
            return "Response bytes still available";
        }
        if self.value & 0xfff0 == 0x63c0 {
            return "Verification failed; counter provided";
        }
        match self.value {
            0x6200 => "No information given",
            0x6281 => "Returned data may be corrupted",
            0x6282 => "End of file reached before reading L_e bytes",
            0x6300 => "No information given (warning)",
            0x6400 => "Execution error; state of non-volatile memory unchanged",
            0x6581 => "Memory failure",
            0x6700 => "Wrong length",
            0x6881 => "Logical channel not supported",
            0x6882 => "Secure messaging not supported",
            0x6982 => "Security status not satisfied",
            0x6985 => "Conditions of use not satisfied",
            0x6999 => "Applet selection failed",
            0x6a80 => "Incorrect parameters in the command data field",
            0x6a81 => "Function not supported",
            0x6a82 => "Applet or file not found",
            0x6a86 => "Incorrect parameters P1-P2",
            0x6b00 => "Wrong parameters P1-P2",
            0x6d00 => "Instruction code not supported or invalid",
            0x6e00 => "Class not supported",
            0x6f00 => "No precise diagnosis",
            0x9000 => "Success",
            _ => "Unknown status word",
        }
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04X}", self.value)
    }
}

impl fmt::Debug for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "StatusWord({:04X}: {})", self.value, self.description())
    }
}

struct StatusWordVisitor;

impl<'de> Visitor<'de> for StatusWordVisitor {
    type Value = StatusWord;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a two-byte status word")
    }

    fn visit_u16<E: ::serde::de::Error>(self, v: u16) -> ::std::result::Result<Self::Value, E> {
        Ok(StatusWord::new_from_value(v))
    }

    // Self-describing formats (MessagePack included) may hand small values
    // back as a narrower or wider integer type than was written.
    fn visit_u8<E: ::serde::de::Error>(self, v: u8) -> ::std::result::Result<Self::Value, E> {
        Ok(StatusWord::new_from_value(v as u16))
    }

    fn visit_u64<E: ::serde::de::Error>(self, v: u64) -> ::std::result::Result<Self::Value, E> {
        u16::try_from(v)
            .map(StatusWord::new_from_value)
            .map_err(|_| E::custom(format!("status word {:#x} is out of range", v)))
    }
}

impl Default for StatusWordVisitor {
    fn default() -> Self {
        StatusWordVisitor {}
    }
}

impl Serialize for StatusWord {
    fn serialize<S: Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.value)
    }
}

impl<'de> Deserialize<'de> for StatusWord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Self, D::Error> {
        deserializer.deserialize_u16(StatusWordVisitor::default())
    }
}
