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

use backtrace::Backtrace;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// The subset of PC/SC return codes a session with a single reader can
/// realistically run into. Anything else is kept verbatim in `Unknown`.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SmartCardErrorCode {
    Cancelled,
    CommDataLost,
    CommError,
    InsufficientBuffer,
    InternalError,
    InvalidHandle,
    InvalidParameter,
    InvalidValue,
    NoMemory,
    NoReadersAvailable,
    NoService,
    NoSmartCard,
    NotReady,
    NotTransacted,
    ProtoMismatch,
    ReaderUnavailable,
    RemovedCard,
    ResetCard,
    ServiceStopped,
    SharingViolation,
    Timeout,
    Unexpected,
    Unknown(pcsc_sys::LONG),
    UnknownCard,
    UnknownError,
    UnknownReader,
    UnpoweredCard,
    UnresponsiveCard,
    UnsupportedCard,
    UnsupportedFeature,
}

static FROM_SCARDERR_H_MAPPING: Lazy<HashMap<pcsc_sys::LONG, SmartCardErrorCode>> =
    Lazy::new(|| {
        let mut m = HashMap::new();
        m.insert(pcsc_sys::SCARD_E_CANCELLED, SmartCardErrorCode::Cancelled);
        m.insert(
            pcsc_sys::SCARD_E_COMM_DATA_LOST,
            SmartCardErrorCode::CommDataLost,
        );
        m.insert(pcsc_sys::SCARD_F_COMM_ERROR, SmartCardErrorCode::CommError);
        m.insert(
            pcsc_sys::SCARD_E_INSUFFICIENT_BUFFER,
            SmartCardErrorCode::InsufficientBuffer,
        );
        m.insert(
            pcsc_sys::SCARD_F_INTERNAL_ERROR,
            SmartCardErrorCode::InternalError,
        );
        m.insert(
            pcsc_sys::SCARD_E_INVALID_HANDLE,
            SmartCardErrorCode::InvalidHandle,
        );
        m.insert(
            pcsc_sys::SCARD_E_INVALID_PARAMETER,
            SmartCardErrorCode::InvalidParameter,
        );
        m.insert(
            pcsc_sys::SCARD_E_INVALID_VALUE,
            SmartCardErrorCode::InvalidValue,
        );
        m.insert(pcsc_sys::SCARD_E_NO_MEMORY, SmartCardErrorCode::NoMemory);
        m.insert(
            pcsc_sys::SCARD_E_NO_READERS_AVAILABLE,
            SmartCardErrorCode::NoReadersAvailable,
        );
        m.insert(pcsc_sys::SCARD_E_NO_SERVICE, SmartCardErrorCode::NoService);
        m.insert(
            pcsc_sys::SCARD_E_NO_SMARTCARD,
            SmartCardErrorCode::NoSmartCard,
        );
        m.insert(pcsc_sys::SCARD_E_NOT_READY, SmartCardErrorCode::NotReady);
        m.insert(
            pcsc_sys::SCARD_E_NOT_TRANSACTED,
            SmartCardErrorCode::NotTransacted,
        );
        m.insert(
            pcsc_sys::SCARD_E_PROTO_MISMATCH,
            SmartCardErrorCode::ProtoMismatch,
        );
        m.insert(
            pcsc_sys::SCARD_E_READER_UNAVAILABLE,
            SmartCardErrorCode::ReaderUnavailable,
        );
        m.insert(
            pcsc_sys::SCARD_W_REMOVED_CARD,
            SmartCardErrorCode::RemovedCard,
        );
        m.insert(pcsc_sys::SCARD_W_RESET_CARD, SmartCardErrorCode::ResetCard);
        m.insert(
            pcsc_sys::SCARD_E_SERVICE_STOPPED,
            SmartCardErrorCode::ServiceStopped,
        );
        m.insert(
            pcsc_sys::SCARD_E_SHARING_VIOLATION,
            SmartCardErrorCode::SharingViolation,
        );
        m.insert(pcsc_sys::SCARD_E_TIMEOUT, SmartCardErrorCode::Timeout);
        m.insert(pcsc_sys::SCARD_E_UNEXPECTED, SmartCardErrorCode::Unexpected);
        m.insert(
            pcsc_sys::SCARD_E_UNKNOWN_CARD,
            SmartCardErrorCode::UnknownCard,
        );
        m.insert(
            pcsc_sys::SCARD_F_UNKNOWN_ERROR,
            SmartCardErrorCode::UnknownError,
        );
        m.insert(
            pcsc_sys::SCARD_E_UNKNOWN_READER,
            SmartCardErrorCode::UnknownReader,
        );
        m.insert(
            pcsc_sys::SCARD_W_UNPOWERED_CARD,
            SmartCardErrorCode::UnpoweredCard,
        );
        m.insert(
            pcsc_sys::SCARD_W_UNRESPONSIVE_CARD,
            SmartCardErrorCode::UnresponsiveCard,
        );
        m.insert(
            pcsc_sys::SCARD_W_UNSUPPORTED_CARD,
            SmartCardErrorCode::UnsupportedCard,
        );
        m.insert(
            pcsc_sys::SCARD_E_UNSUPPORTED_FEATURE,
            SmartCardErrorCode::UnsupportedFeature,
        );
        m
    });

static TO_SCARDERR_H_MAPPING: Lazy<HashMap<SmartCardErrorCode, pcsc_sys::LONG>> =
    Lazy::new(|| {
        FROM_SCARDERR_H_MAPPING
            .iter()
            .map(|pair| (*pair.1, *pair.0))
            .collect()
    });

impl SmartCardErrorCode {
    pub fn new(code: pcsc_sys::LONG) -> ::std::result::Result<(), SmartCardErrorCode> {
        match code {
            pcsc_sys::SCARD_S_SUCCESS => Ok(()),
            _ => Err(FROM_SCARDERR_H_MAPPING
                .get(&code)
                .copied()
                .unwrap_or(SmartCardErrorCode::Unknown(code))),
        }
    }

    pub fn get_code(&self) -> pcsc_sys::LONG {
        match self {
            SmartCardErrorCode::Unknown(code) => *code,
            _ => TO_SCARDERR_H_MAPPING
                .get(self)
                .copied()
                .unwrap_or(pcsc_sys::SCARD_F_UNKNOWN_ERROR),
        }
    }

    pub fn get_message(&self) -> &str {
        match self {
            SmartCardErrorCode::Cancelled => "The action was canceled by an SCardCancel request.",
            SmartCardErrorCode::CommDataLost => {
                "A communications error with the smart card has been detected."
            }
            SmartCardErrorCode::CommError => "An internal communications error has been detected.",
            SmartCardErrorCode::InsufficientBuffer => {
                "The data buffer for returned data is too small for the returned data."
            }
            SmartCardErrorCode::InternalError => "An internal consistency check failed.",
            SmartCardErrorCode::InvalidHandle => "The supplied handle was not valid.",
            SmartCardErrorCode::InvalidParameter => {
                "One or more of the supplied parameters could not be properly interpreted."
            }
            SmartCardErrorCode::InvalidValue => {
                "One or more of the supplied parameter values could not be properly interpreted."
            }
            SmartCardErrorCode::NoMemory => "Not enough memory available to complete this command.",
            SmartCardErrorCode::NoReadersAvailable => "No smart card reader is available.",
            SmartCardErrorCode::NoService => "The smart card resource manager is not running.",
            SmartCardErrorCode::NoSmartCard => {
                "The operation requires a smart card, but no smart card is currently in the device."
            }
            SmartCardErrorCode::NotReady => {
                "The reader or smart card is not ready to accept commands."
            }
            SmartCardErrorCode::NotTransacted => {
                "An attempt was made to end a non-existent transaction."
            }
            SmartCardErrorCode::ProtoMismatch => {
                "The requested protocols are incompatible with the protocol currently in use."
            }
            SmartCardErrorCode::ReaderUnavailable => {
                "The specified reader is not currently available for use."
            }
            SmartCardErrorCode::RemovedCard => {
                "The smart card has been removed, so further communication is not possible."
            }
            SmartCardErrorCode::ResetCard => {
                "The smart card was reset, so any shared state information is invalid."
            }
            SmartCardErrorCode::ServiceStopped => "The smart card resource manager has shut down.",
            SmartCardErrorCode::SharingViolation => {
                "The smart card cannot be accessed because of other outstanding connections."
            }
            SmartCardErrorCode::Timeout => "The user-specified timeout value has expired.",
            SmartCardErrorCode::Unexpected => "An unexpected card error has occurred.",
            SmartCardErrorCode::Unknown(_) => "Unrecognized PC/SC error code.",
            SmartCardErrorCode::UnknownCard => "The specified smart card name is not recognized.",
            SmartCardErrorCode::UnknownError => {
                "An internal error has been detected, but the source is unknown."
            }
            SmartCardErrorCode::UnknownReader => "The specified reader name is not recognized.",
            SmartCardErrorCode::UnpoweredCard => {
                "Power has been removed from the smart card, so further communication is not possible."
            }
            SmartCardErrorCode::UnresponsiveCard => {
                "The smart card is not responding to a reset."
            }
            SmartCardErrorCode::UnsupportedCard => {
                "The reader can't communicate with the card, due to ATR string config conflicts."
            }
            SmartCardErrorCode::UnsupportedFeature => {
                "This smart card does not support the requested feature."
            }
        }
    }
}

impl fmt::Display for SmartCardErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> ::std::result::Result<(), fmt::Error> {
        write!(f, "{}", self.get_message())
    }
}

impl fmt::Debug for SmartCardErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> ::std::result::Result<(), fmt::Error> {
        write!(f, "{:#x} {}", self.get_code(), self)
    }
}

#[derive(Debug)]
pub struct SmartCardError {
    code: SmartCardErrorCode,
    _backtrace: Backtrace,
}

impl SmartCardError {
    pub fn new(code: pcsc_sys::LONG) -> ::std::result::Result<(), SmartCardError> {
        SmartCardErrorCode::new(code).map_err(SmartCardError::from)
    }

    pub fn get_code(&self) -> &SmartCardErrorCode {
        &self.code
    }
}

impl From<SmartCardErrorCode> for SmartCardError {
    fn from(code: SmartCardErrorCode) -> Self {
        SmartCardError {
            code: code,
            _backtrace: Backtrace::new(),
        }
    }
}

impl fmt::Display for SmartCardError {
    fn fmt(&self, f: &mut fmt::Formatter) -> ::std::result::Result<(), fmt::Error> {
        write!(f, "{}", self.code)
    }
}

impl std::error::Error for SmartCardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
