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

use crate::applet::apdu::Apdu;
use crate::applet::sw::StatusWord;
use crate::error::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub type RecordedResult<T> = ::std::result::Result<T, String>;

/// A single exchange with the hardware: the raw APDU we sent, and what came
/// back (or the error message, if the transmit itself failed).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecordingEntry {
    pub sent: Vec<u8>,
    pub received: RecordedResult<(StatusWord, Vec<u8>)>,
}

impl RecordingEntry {
    pub fn new(sent: &Apdu, received: &Result<(StatusWord, Vec<u8>)>) -> Self {
        RecordingEntry {
            sent: sent.raw().to_vec(),
            received: match received {
                Err(e) => Err(e.to_string()),
                Ok(tuple) => Ok(tuple.clone()),
            },
        }
    }

    /// Construct an entry for an exchange which completed with the given
    /// status word and response body.
    pub fn new_ok(sent: &[u8], sw: StatusWord, data: &[u8]) -> Self {
        RecordingEntry {
            sent: sent.to_vec(),
            received: Ok((sw, data.to_vec())),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Recording(pub VecDeque<RecordingEntry>);

impl Recording {
    pub fn record(&mut self, sent: &Apdu, received: &Result<(StatusWord, Vec<u8>)>) {
        self.0.push_back(RecordingEntry::new(sent, received));
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(rmp_serde::from_read(reader)?)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Write this recording out to the given file, replacing its contents.
    pub fn flush<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        rmp_serde::encode::write(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
