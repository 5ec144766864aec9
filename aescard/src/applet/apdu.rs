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

use crate::applet::{Instruction, APPLET_AID};
use crate::error::*;
use std::fmt;

/// The total number of bytes in a single short APDU.
const APDU_BYTES: usize = 260;
/// The number of bytes an APDU's properties (instruction class, instruction
/// code, ...) occupy. These bytes are unavailable for arbitrary data.
pub const APDU_PROPERTY_BYTES: usize = 5;
/// The number of arbitrary non-property bytes which can be sent along with a
/// single APDU.
pub const APDU_DATA_BYTES: usize = u8::MAX as usize;

/// APDU stands for "smart card Application Protocol Data Unit". This is the
/// command half of an exchange: a header, a one-byte length, and up to 255
/// bytes of command data.
#[derive(Clone, Copy)]
pub struct Apdu {
    raw: [u8; APDU_BYTES],
    len: usize,
}

impl Apdu {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > APDU_BYTES {
            return Err(Error::InvalidArgument(format!(
                "invalid APDU data; expected at most {} bytes, got {}",
                APDU_BYTES,
                bytes.len()
            )));
        }
        if bytes.len() < APDU_PROPERTY_BYTES {
            return Err(Error::InvalidArgument(format!(
                "invalid APDU data; expected at least {} bytes, got {}",
                APDU_PROPERTY_BYTES,
                bytes.len()
            )));
        }
        let mut apdu = Apdu {
            raw: [0; APDU_BYTES],
            len: bytes.len(),
        };
        apdu.raw[..bytes.len()].copy_from_slice(bytes);
        Ok(apdu)
    }

    pub fn from_pieces(cla: u8, ins: u8, p1: u8, p2: u8, data: &[u8]) -> Result<Self> {
        if data.len() > APDU_DATA_BYTES {
            return Err(Error::InvalidArgument(format!(
                "invalid APDU data; expected at most {} bytes, got {}",
                APDU_DATA_BYTES,
                data.len()
            )));
        }
        let mut apdu = Apdu {
            raw: [0; APDU_BYTES],
            len: APDU_PROPERTY_BYTES + data.len(),
        };
        apdu.raw[0] = cla;
        apdu.raw[1] = ins;
        apdu.raw[2] = p1;
        apdu.raw[3] = p2;
        apdu.raw[4] = data.len() as u8;
        apdu.raw[APDU_PROPERTY_BYTES..apdu.len].copy_from_slice(data);
        Ok(apdu)
    }

    /// Construct an APDU for one of the instructions this crate knows about,
    /// carrying the given command data.
    pub fn new_command(instruction: Instruction, data: &[u8]) -> Result<Self> {
        Self::from_pieces(
            instruction.cla(),
            instruction.ins(),
            instruction.p1(),
            0,
            data,
        )
    }

    /// Construct the SELECT APDU which should be sent to the card right after
    /// connecting, so subsequent commands reach the AES applet.
    pub fn new_select() -> Result<Self> {
        Self::new_command(Instruction::Select, &APPLET_AID)
    }

    /// Construct a GET RESPONSE APDU, asking the card for `le` more bytes of a
    /// response it couldn't return all at once. Here the fifth byte is L_e, not
    /// L_c, and there is no command data.
    pub fn new_get_response(le: u8) -> Self {
        let mut apdu = Apdu {
            raw: [0; APDU_BYTES],
            len: APDU_PROPERTY_BYTES,
        };
        apdu.raw[0] = Instruction::GetResponse.cla();
        apdu.raw[1] = Instruction::GetResponse.ins();
        apdu.raw[4] = le;
        apdu
    }

    /// Return the bytes which actually go over the wire: the properties, then
    /// the command data.
    pub fn raw(&self) -> &[u8] {
        &self.raw[..self.len]
    }

    /// Instruction class - indicates the type of command, e.g. interindustry or
    /// proprietary.
    pub fn cla(&self) -> u8 {
        self.raw[0]
    }

    /// Instruction code - indicates the specific command, e.g. "encrypt".
    pub fn ins(&self) -> u8 {
        self.raw[1]
    }

    pub fn p1(&self) -> u8 {
        self.raw[2]
    }

    pub fn p2(&self) -> u8 {
        self.raw[3]
    }

    /// Encodes the number (N_c) of bytes of command data to follow. This crate
    /// only ever sends short APDUs, so this is always exactly one byte.
    pub fn lc(&self) -> u8 {
        self.raw[4]
    }

    /// The command data, excluding the properties.
    pub fn data(&self) -> &[u8] {
        &self.raw[APDU_PROPERTY_BYTES..self.len]
    }

    pub fn instruction(&self) -> Option<Instruction> {
        Instruction::from_bytes(self.cla(), self.ins())
    }
}

/// Frame the given payload as an APDU for the given instruction, returning the
/// raw bytes: `[CLA, INS, P1, P2, LEN] + payload`.
pub fn frame(instruction: Instruction, payload: &[u8]) -> Result<Vec<u8>> {
    Ok(Apdu::new_command(instruction, payload)?.raw().to_vec())
}

impl fmt::Debug for Apdu {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Apdu {{ cla: {:02x}, ins: {:02x}, p1: {:02x}, p2: {:02x}, lc: {:02x}, data: [{}] }}",
            self.cla(),
            self.ins(),
            self.p1(),
            self.p2(),
            self.lc(),
            self.data()
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<String>()
        )
    }
}

impl PartialEq for Apdu {
    fn eq(&self, other: &Apdu) -> bool {
        self.raw() == other.raw()
    }
}

impl Eq for Apdu {}
