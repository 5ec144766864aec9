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
use crate::applet::hal::{PcscHal, PcscHardware};
use crate::applet::sw::StatusWord;
use crate::applet::util::{to_hex, to_hex_string};
use crate::applet::{Instruction, BLOCK_BYTES, IV_BYTES, KEY_BYTES, MAX_CHUNK_BYTES};
use crate::crypto;
use crate::error::*;
use crate::padding;
use log::{debug, info};
use std::fmt;

/// Where a session is in its (strictly linear) lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    /// Not connected to any reader.
    Disconnected,
    /// Connected to a reader, but the applet hasn't been selected.
    Connected,
    /// The applet is selected, but the key and / or IV haven't been set yet.
    Selected,
    /// Both the key and IV are set; the applet is ready to encrypt or decrypt.
    Ready,
}

/// One command / response pair, as it went over the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Exchange {
    pub apdu: Apdu,
    pub sw: StatusWord,
    pub response: Vec<u8>,
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "APDU: {} -> SW1SW2: {}, Response: {}",
            to_hex_string(self.apdu.raw()),
            self.sw,
            to_hex_string(self.response.as_slice())
        )
    }
}

/// A session with the AES applet on a single card.
pub struct Handle<T: PcscHal> {
    hal: T,
    state: State,
    reader: Option<String>,
    key_set: bool,
    iv: Option<[u8; IV_BYTES]>,
    // The IV most recently loaded into the applet, which isn't always the
    // session IV: chained chunks temporarily replace it.
    card_iv: [u8; IV_BYTES],
    transcript: Vec<Exchange>,
}

impl Handle<PcscHardware> {
    pub fn new() -> Result<Self> {
        Ok(Self::new_with_hal(PcscHardware::new()?))
    }
}

impl<T: PcscHal> Handle<T> {
    pub fn new_with_hal(hal: T) -> Self {
        Handle {
            hal: hal,
            state: State::Disconnected,
            reader: None,
            key_set: false,
            iv: None,
            card_iv: [0; IV_BYTES],
            transcript: Vec::new(),
        }
    }

    pub fn get_hal(&self) -> &T {
        &self.hal
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The full name of the reader this session is connected to, if any.
    pub fn reader(&self) -> Option<&str> {
        self.reader.as_deref()
    }

    /// The session IV, if one has been set.
    pub fn iv(&self) -> Option<&[u8]> {
        self.iv.as_ref().map(|iv| &iv[..])
    }

    /// Remove and return every exchange made since the last call.
    pub fn take_transcript(&mut self) -> Vec<Exchange> {
        std::mem::take(&mut self.transcript)
    }

    pub fn list_readers(&self) -> Result<Vec<String>> {
        self.hal.list_readers()
    }

    /// Connect to the first reader whose name contains the given string (or
    /// the default reader), and select the applet.
    pub fn connect(&mut self, reader: Option<&str>) -> Result<()> {
        if self.state != State::Disconnected {
            self.disconnect();
        }

        let reader = self.hal.connect(reader)?;
        info!("Using reader '{}'", reader);
        self.reader = Some(reader);
        self.state = State::Connected;
        self.select()
    }

    /// (Re-)select the applet. Selecting clears the applet's IV, and any key or
    /// IV this session set before must be set again.
    pub fn select(&mut self) -> Result<()> {
        if self.state == State::Disconnected {
            return Err(Error::InvalidState(
                "can't select the applet without first being connected".to_owned(),
            ));
        }

        // Whatever the outcome, the applet's key and IV no longer belong to
        // this session.
        self.state = State::Connected;
        self.key_set = false;
        self.iv = None;
        self.card_iv = [0; IV_BYTES];

        let apdu = Apdu::new_select()?;
        let (sw, _) = self.transmit(&apdu)?;
        sw.check(Instruction::Select)?;

        info!("Selected applet {}", to_hex(apdu.data()));
        self.state = State::Selected;
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.hal.disconnect();
        self.state = State::Disconnected;
        self.reader = None;
        self.key_set = false;
        self.iv = None;
    }

    fn require_selected(&self, what: &str) -> Result<()> {
        match self.state {
            State::Selected | State::Ready => Ok(()),
            state => Err(Error::InvalidState(format!(
                "{} requires the applet to be selected (session is {:?})",
                what, state
            ))),
        }
    }

    fn require_ready(&self, what: &str) -> Result<[u8; IV_BYTES]> {
        match (self.state, self.iv) {
            (State::Ready, Some(iv)) => Ok(iv),
            (state, _) => Err(Error::InvalidState(format!(
                "{} requires a key and IV to be set (session is {:?})",
                what, state
            ))),
        }
    }

    fn update_state(&mut self) {
        if self.key_set && self.iv.is_some() && self.state == State::Selected {
            debug!("Key and IV set; session is ready");
            self.state = State::Ready;
        }
    }

    fn transmit(&mut self, apdu: &Apdu) -> Result<(StatusWord, Vec<u8>)> {
        let (sw, response) = self.hal.send_data(apdu)?;
        self.transcript.push(Exchange {
            apdu: *apdu,
            sw: sw,
            response: response.clone(),
        });
        Ok((sw, response))
    }

    fn send_command(&mut self, instruction: Instruction, data: &[u8]) -> Result<Vec<u8>> {
        let (sw, response) = self.transmit(&Apdu::new_command(instruction, data)?)?;
        sw.check(instruction)?;
        Ok(response)
    }

    /// Load the given 32-byte AES key into the applet.
    pub fn set_key(&mut self, key: &[u8]) -> Result<()> {
        self.require_selected("SET_KEY")?;
        if key.len() != KEY_BYTES {
            return Err(Error::InvalidLength {
                what: "key",
                expected: KEY_BYTES.to_string(),
                actual: key.len(),
            });
        }

        self.send_command(Instruction::SetKey, key)?;
        self.key_set = true;
        self.update_state();
        Ok(())
    }

    fn load_card_iv(&mut self, iv: &[u8; IV_BYTES]) -> Result<()> {
        self.send_command(Instruction::SetIv, iv)?;
        self.card_iv = *iv;
        Ok(())
    }

    /// Set the session IV, and load it into the applet.
    pub fn set_iv(&mut self, iv: &[u8]) -> Result<()> {
        self.require_selected("SET_IV")?;
        let iv: [u8; IV_BYTES] = iv.try_into().map_err(|_| Error::InvalidLength {
            what: "IV",
            expected: IV_BYTES.to_string(),
            actual: iv.len(),
        })?;

        self.load_card_iv(&iv)?;
        self.iv = Some(iv);
        self.update_state();
        Ok(())
    }

    /// Send the given message to the applet in chunks it can handle. Each
    /// chunk after the first is chained to the one before it by loading the
    /// previous chunk's last ciphertext block as the IV, so the overall result
    /// is the same as a single CBC operation over the whole message.
    fn process_chunks(&mut self, instruction: Instruction, data: &[u8]) -> Result<Vec<u8>> {
        let mut output: Vec<u8> = Vec::with_capacity(data.len());
        let mut chain_iv: Option<[u8; IV_BYTES]> = None;
        for chunk in data.chunks(MAX_CHUNK_BYTES) {
            if let Some(iv) = chain_iv.as_ref() {
                self.load_card_iv(iv)?;
            }

            debug!("Sending {} of {} total bytes", chunk.len(), data.len());
            let response = self.send_command(instruction, chunk)?;
            if response.len() != chunk.len() {
                return Err(Error::UnexpectedResponse(format!(
                    "{} of {} bytes returned {} bytes",
                    instruction,
                    chunk.len(),
                    response.len()
                )));
            }

            let ciphertext = match instruction {
                Instruction::Encrypt => response.as_slice(),
                _ => chunk,
            };
            let mut next_iv = [0; IV_BYTES];
            next_iv.copy_from_slice(&ciphertext[ciphertext.len() - BLOCK_BYTES..]);
            chain_iv = Some(next_iv);

            output.extend_from_slice(response.as_slice());
        }
        Ok(output)
    }

    /// Encrypt the given block-aligned data on the card, without padding it.
    pub fn encrypt_raw(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let iv = self.require_ready("ENCRYPT")?;
        crypto::check_block_multiple("plaintext", data)?;
        if self.card_iv != iv {
            self.load_card_iv(&iv)?;
        }
        self.process_chunks(Instruction::Encrypt, data)
    }

    /// PKCS#7 pad the given plaintext, and encrypt it on the card.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.encrypt_raw(padding::pad(plaintext).as_slice())
    }

    /// Decrypt the given ciphertext on the card, without removing any padding.
    /// The session IV is always re-sent first.
    pub fn decrypt_raw(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let iv = self.require_ready("DECRYPT")?;
        crypto::check_block_multiple("ciphertext", ciphertext)?;
        self.load_card_iv(&iv)?;
        self.process_chunks(Instruction::Decrypt, ciphertext)
    }

    /// Decrypt the given ciphertext on the card, and strip its PKCS#7 padding.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        padding::unpad(self.decrypt_raw(ciphertext)?.as_slice())
    }

    /// Check the applet against the host-side AES-256-CBC implementation,
    /// using a random key, IV, and `message_len`-byte message. On return the
    /// session's key and IV are the random ones.
    pub fn self_test(&mut self, message_len: usize) -> Result<()> {
        self.require_selected("self test")?;

        let mut key = [0_u8; KEY_BYTES];
        self.hal.secure_random_bytes(&mut key)?;
        let mut iv = [0_u8; IV_BYTES];
        self.hal.secure_random_bytes(&mut iv)?;
        let mut message = vec![0_u8; message_len];
        self.hal.cheap_random_bytes(&mut message)?;

        self.set_key(&key)?;
        self.set_iv(&iv)?;

        let ciphertext = self.encrypt(message.as_slice())?;
        let expected = crypto::aes_256_cbc_encrypt(&key, &iv, padding::pad(&message).as_slice())?;
        if ciphertext != expected {
            return Err(Error::SelfTestFailed(format!(
                "card ciphertext {} doesn't match expected {}",
                to_hex(&ciphertext),
                to_hex(&expected)
            )));
        }

        let plaintext = self.decrypt(ciphertext.as_slice())?;
        if plaintext != message {
            return Err(Error::SelfTestFailed(
                "decrypted result did not match original plaintext".to_owned(),
            ));
        }

        info!(
            "Self test passed with a {} byte message ({} bytes of ciphertext)",
            message_len,
            ciphertext.len()
        );
        Ok(())
    }
}

impl<T: PcscHal> Drop for Handle<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
