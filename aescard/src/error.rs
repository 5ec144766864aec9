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
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Utf8Error {
    #[error("{0}")]
    String(#[from] std::string::FromUtf8Error),
    #[error("{0}")]
    Slice(#[from] std::str::Utf8Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Bdrck(#[from] bdrck::error::Error),
    /// The card answered a command with a status word other than 0x9000.
    #[error("{instruction} failed: SW1SW2 = {sw1:02X}{sw2:02X}")]
    CommandFailed {
        instruction: Instruction,
        sw1: u8,
        sw2: u8,
    },
    #[error("{0}")]
    HexDecode(#[from] data_encoding::DecodeError),
    /// An internal unrecoverable error, usually due to some underlying library.
    #[error("internal error: {0}")]
    Internal(String),
    /// Errors akin to EINVAL.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid {what} length: expected {expected}, got {actual} bytes")]
    InvalidLength {
        what: &'static str,
        expected: String,
        actual: usize,
    },
    /// The data being unpadded doesn't end with valid PKCS#7 padding.
    #[error("invalid PKCS#7 padding")]
    InvalidPadding,
    /// An operation was attempted before the session reached the state it requires.
    #[error("invalid session state: {0}")]
    InvalidState(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("no smartcard readers found")]
    NoReaders,
    #[error("{0}")]
    Nul(#[from] std::ffi::NulError),
    #[error("{0}")]
    RmpDecode(#[from] rmp_serde::decode::Error),
    #[error("{0}")]
    RmpEncode(#[from] rmp_serde::encode::Error),
    #[error("self test failed: {0}")]
    SelfTestFailed(String),
    #[error("{0}")]
    SmartCard(#[from] crate::applet::scarderr::SmartCardError),
    #[error("{0}")]
    Ssl(#[from] openssl::error::ErrorStack),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("no reader matching '{0}' found")]
    UnknownReader(String),
    #[error("{0}")]
    Utf8(Utf8Error),
}

// This is a shim to allow us to convert from an underlying error to an Error, *via* a Utf8Error as
// an intermediate type. The compiler doesn't notice that this is possible without us providing
// this implementation explicitly.
impl<E> From<E> for Error
where
    E: Into<Utf8Error>,
{
    fn from(e: E) -> Self {
        Error::Utf8(e.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
