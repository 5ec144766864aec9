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
use crate::applet::recording::Recording;
use crate::applet::scarderr::SmartCardError;
use crate::applet::sw::StatusWord;
use crate::applet::DEFAULT_READER;
use crate::crypto;
use crate::error::*;
use libc::c_char;
use log::{debug, error, info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Mutex;

/// The size of the buffer responses are received into: up to 256 bytes of
/// response data, plus the two status word bytes.
const RECV_BUFFER_BYTES: usize = 258;

/// The most response data a short APDU can produce, across any number of GET
/// RESPONSE commands.
pub const MAX_RESPONSE_BYTES: usize = 256;

/// How many GET RESPONSE commands a single exchange may issue before the card
/// is considered broken.
pub const MAX_GET_RESPONSE_ROUNDS: usize = 16;

pub trait PcscHal {
    /// Construct a new HAL, ready to connect to / interact with underlying
    /// hardware.
    fn new() -> Result<Self>
    where
        Self: ::std::marker::Sized;

    /// Populate the given buffer with cryptographically secure random bytes.
    fn secure_random_bytes(&self, buf: &mut [u8]) -> Result<()>;

    /// Populate the given buffer with cheap-to-generate but possibly weak
    /// random bytes. *NOTE*: be extremely careful with using this function in
    /// cryptographically sensitive situations.
    fn cheap_random_bytes(&self, buf: &mut [u8]) -> Result<()>;

    /// Return a list of the PC/SC readers currently available on the system.
    fn list_readers(&self) -> Result<Vec<String>>;

    /// Actually connect to the given reader using the native PC/SC library.
    /// This trait already provides the higher level `connect`, which handles
    /// selecting the right reader. This function simply wraps the real
    /// interaction with the underlying hardware.
    fn connect_impl(&mut self, reader: &str) -> Result<()>;

    /// Connect to the given reader (or the default reader, if none was
    /// specified), returning the full name of the reader we connected to. This
    /// must be called before e.g. data is sent or transactions are started.
    fn connect(&mut self, reader: Option<&str>) -> Result<String> {
        let reader = reader.unwrap_or(DEFAULT_READER);
        let readers = self.list_readers()?;
        if readers.is_empty() {
            return Err(Error::NoReaders);
        }

        for potential_reader in readers {
            if !potential_reader.contains(reader) {
                info!(
                    "Skipping reader '{}' since it doesn't match '{}'",
                    potential_reader, reader
                );
                continue;
            }

            info!("Attempting to connect to reader '{}'", potential_reader);
            self.connect_impl(potential_reader.as_str())?;
            return Ok(potential_reader);
        }

        Err(Error::UnknownReader(reader.to_owned()))
    }

    /// Disconnect from the current reader, if any.
    fn disconnect(&mut self);

    /// Send a single APDU to the underlying hardware
    /// (https://en.wikipedia.org/wiki/Smart_card_application_protocol_data_unit). This function
    /// should return a status word, as well as any bytes returned by the hardware.
    fn send_data_impl(&self, apdu: &Apdu) -> Result<(StatusWord, Vec<u8>)>;

    /// Start a new PC/SC transaction with the underlying hardware.
    fn begin_transaction(&self) -> Result<()>;

    /// End a previously started PC/SC transaction with the underlying hardware.
    fn end_transaction(&self) -> Result<()>;

    /// A provided, higher-level interface for sending data to the underlying hardware. The
    /// exchange happens inside a transaction, and if the card indicates it has more response
    /// data than it could return at once, the rest is collected with GET RESPONSE.
    fn send_data(&self, apdu: &Apdu) -> Result<(StatusWord, Vec<u8>)> {
        self.begin_transaction()?;

        let exchange = || -> Result<(StatusWord, Vec<u8>)> {
            let (mut sw, mut out_data) = self.send_data_impl(apdu)?;
            let mut rounds: usize = 0;
            while let Some(bytes_remaining) = sw.bytes_remaining {
                rounds += 1;
                if rounds > MAX_GET_RESPONSE_ROUNDS {
                    return Err(Error::UnexpectedResponse(format!(
                        "card still reports more data after {} GET RESPONSE commands",
                        MAX_GET_RESPONSE_ROUNDS
                    )));
                }
                debug!(
                    "The card indicates there are {} more bytes of data to read",
                    bytes_remaining
                );
                let (sw_new, mut recv) =
                    self.send_data_impl(&Apdu::new_get_response(bytes_remaining as u8))?;
                sw = sw_new;
                out_data.append(&mut recv);
                if out_data.len() > MAX_RESPONSE_BYTES {
                    return Err(Error::UnexpectedResponse(format!(
                        "response exceeded {} bytes",
                        MAX_RESPONSE_BYTES
                    )));
                }
            }
            Ok((sw, out_data))
        };
        let ret = exchange();

        // Always release the card, even if the exchange failed part way through.
        let end = self.end_transaction();
        let ret = ret?;
        end?;
        Ok(ret)
    }
}

/// An implementation of PcscHal which actually talks to real hardware using the PC/SC library.
pub struct PcscHardware {
    context: pcsc_sys::SCARDCONTEXT,
    card: pcsc_sys::SCARDHANDLE,
    active_protocol: pcsc_sys::DWORD,
    recording: Option<Mutex<Recording>>,
    output_recording: Option<PathBuf>,
}

impl PcscHardware {
    fn new_impl(
        recording: Option<Mutex<Recording>>,
        output_recording: Option<PathBuf>,
    ) -> Result<Self> {
        let mut context: pcsc_sys::SCARDCONTEXT = pcsc_sys::SCARD_E_INVALID_HANDLE;
        SmartCardError::new(unsafe {
            pcsc_sys::SCardEstablishContext(
                pcsc_sys::SCARD_SCOPE_SYSTEM,
                ptr::null(),
                ptr::null(),
                &mut context,
            )
        })?;

        Ok(PcscHardware {
            context: context,
            card: 0,
            active_protocol: pcsc_sys::SCARD_PROTOCOL_UNDEFINED,
            recording: recording,
            output_recording: output_recording,
        })
    }

    /// Construct a HAL which records every exchange with the hardware, and
    /// writes the recording to the given file when it is dropped.
    pub fn new_with_recording<P: AsRef<Path>>(output: P) -> Result<Self> {
        Self::new_impl(
            Some(Mutex::new(Recording::default())),
            Some(output.as_ref().to_path_buf()),
        )
    }

    fn send_data_impl_impl(&self, apdu: &[u8]) -> Result<(StatusWord, Vec<u8>)> {
        debug!(
            "> {}",
            apdu.iter().map(|b| format!("{:02x}", b)).collect::<String>()
        );

        let mut recv_buffer: Vec<u8> = vec![0; RECV_BUFFER_BYTES];
        let mut recv_length = recv_buffer.len() as pcsc_sys::DWORD;
        SmartCardError::new(unsafe {
            let pci = if self.active_protocol == pcsc_sys::SCARD_PROTOCOL_T0 {
                &pcsc_sys::g_rgSCardT0Pci
            } else {
                &pcsc_sys::g_rgSCardT1Pci
            };
            pcsc_sys::SCardTransmit(
                self.card,
                pci,
                apdu.as_ptr(),
                apdu.len() as pcsc_sys::DWORD,
                ptr::null_mut(),
                recv_buffer.as_mut_ptr(),
                &mut recv_length,
            )
        })?;

        recv_buffer.truncate(recv_length as usize);
        debug!(
            "< {}",
            recv_buffer
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<String>()
        );

        if recv_buffer.len() < 2 {
            return Err(Error::UnexpectedResponse(format!(
                "expected at least a 2 byte status word, got {} bytes",
                recv_buffer.len()
            )));
        }
        let sw = StatusWord::new(recv_buffer.as_slice());
        recv_buffer.truncate(recv_buffer.len() - 2);
        Ok((sw, recv_buffer))
    }
}

impl PcscHal for PcscHardware {
    fn new() -> Result<Self> {
        Self::new_impl(None, None)
    }

    fn secure_random_bytes(&self, buf: &mut [u8]) -> Result<()> {
        crypto::random_bytes(buf)
    }

    fn cheap_random_bytes(&self, buf: &mut [u8]) -> Result<()> {
        SmallRng::from_entropy().fill(buf);
        Ok(())
    }

    fn list_readers(&self) -> Result<Vec<String>> {
        let mut readers_len: pcsc_sys::DWORD = 0;
        let ret = unsafe {
            pcsc_sys::SCardListReaders(self.context, ptr::null(), ptr::null_mut(), &mut readers_len)
        };
        // pcsc-lite reports a missing reader as an error, but to us it's just an empty list.
        if ret == pcsc_sys::SCARD_E_NO_READERS_AVAILABLE {
            return Ok(vec![]);
        }
        SmartCardError::new(ret)?;

        let mut buffer: Vec<u8> = vec![0_u8; readers_len as usize];
        SmartCardError::new(unsafe {
            pcsc_sys::SCardListReaders(
                self.context,
                ptr::null(),
                buffer.as_mut_ptr() as *mut c_char,
                &mut readers_len,
            )
        })?;
        if readers_len as usize != buffer.len() {
            return Err(Error::Internal(
                "failed to retrieve full reader list due to buffer size race".to_owned(),
            ));
        }

        let ret: ::std::result::Result<Vec<String>, ::std::str::Utf8Error> = buffer
            .split(|b| *b == 0)
            .filter_map(|slice| match slice.len() {
                0 => None,
                _ => Some(::std::str::from_utf8(slice).map(|s| s.to_owned())),
            })
            .collect();

        Ok(ret?)
    }

    fn connect_impl(&mut self, reader: &str) -> Result<()> {
        let reader = CString::new(reader)?;
        let mut active_protocol: pcsc_sys::DWORD = pcsc_sys::SCARD_PROTOCOL_UNDEFINED;
        let ret = SmartCardError::new(unsafe {
            pcsc_sys::SCardConnect(
                self.context,
                reader.as_ptr(),
                pcsc_sys::SCARD_SHARE_SHARED,
                pcsc_sys::SCARD_PROTOCOL_T0 | pcsc_sys::SCARD_PROTOCOL_T1,
                &mut self.card,
                &mut active_protocol,
            )
        });

        if let Err(e) = ret {
            if *e.get_code() != crate::applet::scarderr::SmartCardErrorCode::ResetCard {
                return Err(e.into());
            }
            warn!("Card in '{:?}' was unexpectedly reset; reconnecting", reader);
            SmartCardError::new(unsafe {
                pcsc_sys::SCardReconnect(
                    self.card,
                    pcsc_sys::SCARD_SHARE_SHARED,
                    pcsc_sys::SCARD_PROTOCOL_T0 | pcsc_sys::SCARD_PROTOCOL_T1,
                    pcsc_sys::SCARD_RESET_CARD,
                    &mut active_protocol,
                )
            })?;
        }

        self.active_protocol = active_protocol;
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.card != 0 {
            unsafe {
                pcsc_sys::SCardDisconnect(self.card, pcsc_sys::SCARD_RESET_CARD);
            }
            self.card = 0;
            self.active_protocol = pcsc_sys::SCARD_PROTOCOL_UNDEFINED;
        }
    }

    fn send_data_impl(&self, apdu: &Apdu) -> Result<(StatusWord, Vec<u8>)> {
        if let Some(recording) = self.recording.as_ref() {
            let mut lock = recording
                .lock()
                .map_err(|_| Error::Internal("recording lock poisoned".to_owned()))?;
            let ret = self.send_data_impl_impl(apdu.raw());
            lock.record(apdu, &ret);
            ret
        } else {
            self.send_data_impl_impl(apdu.raw())
        }
    }

    fn begin_transaction(&self) -> Result<()> {
        SmartCardError::new(unsafe { pcsc_sys::SCardBeginTransaction(self.card) })?;
        Ok(())
    }

    fn end_transaction(&self) -> Result<()> {
        SmartCardError::new(unsafe {
            pcsc_sys::SCardEndTransaction(self.card, pcsc_sys::SCARD_LEAVE_CARD)
        })?;
        Ok(())
    }
}

impl Drop for PcscHardware {
    fn drop(&mut self) {
        self.disconnect();

        if unsafe { pcsc_sys::SCardIsValidContext(self.context) } == pcsc_sys::SCARD_S_SUCCESS {
            unsafe { pcsc_sys::SCardReleaseContext(self.context) };
        }

        if let (Some(recording), Some(output_recording)) =
            (self.recording.as_ref(), self.output_recording.as_ref())
        {
            let result = match recording.lock() {
                Ok(recording) => recording.flush(output_recording),
                Err(_) => Err(Error::Internal("recording lock poisoned".to_owned())),
            };
            if let Err(e) = result {
                error!(
                    "Failed to write recording to '{}': {}",
                    output_recording.display(),
                    e
                );
            }
        }
    }
}
