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

//! A host-side AES-256-CBC implementation, equivalent to what the applet does
//! on the card. This is only used to check the card's answers; the normal
//! encrypt / decrypt path never uses it.

use crate::applet::{BLOCK_BYTES, IV_BYTES, KEY_BYTES};
use crate::error::*;
use openssl::symm::{Cipher, Crypter, Mode};

/// Populate the given buffer with cryptographically secure random bytes.
pub fn random_bytes(buf: &mut [u8]) -> Result<()> {
    Ok(openssl::rand::rand_bytes(buf)?)
}

pub(crate) fn check_key_and_iv(key: &[u8], iv: &[u8]) -> Result<()> {
    if key.len() != KEY_BYTES {
        return Err(Error::InvalidLength {
            what: "key",
            expected: KEY_BYTES.to_string(),
            actual: key.len(),
        });
    }
    if iv.len() != IV_BYTES {
        return Err(Error::InvalidLength {
            what: "IV",
            expected: IV_BYTES.to_string(),
            actual: iv.len(),
        });
    }
    Ok(())
}

/// Returns an error unless the given message is a non-empty whole number of
/// AES blocks. This is the only kind of message the applet accepts.
pub(crate) fn check_block_multiple(what: &'static str, data: &[u8]) -> Result<()> {
    if data.is_empty() || data.len() % BLOCK_BYTES != 0 {
        return Err(Error::InvalidLength {
            what: what,
            expected: format!("a non-zero multiple of {}", BLOCK_BYTES),
            actual: data.len(),
        });
    }
    Ok(())
}

fn aes_256_cbc(mode: Mode, key: &[u8], iv: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    check_key_and_iv(key, iv)?;
    check_block_multiple("AES-256-CBC input", input)?;

    let mut crypter = Crypter::new(Cipher::aes_256_cbc(), mode, key, Some(iv))?;
    // The applet uses ALG_AES_BLOCK_128_CBC_NOPAD; padding is the host's job.
    crypter.pad(false);
    // OpenSSL requires room for one extra block, even though with padding
    // disabled the output is never longer than the input.
    let mut output = vec![0; input.len() + BLOCK_BYTES];
    let count = crypter.update(input, &mut output)?;
    let rest = crypter.finalize(&mut output[count..])?;
    debug_assert_eq!(input.len(), count + rest);
    output.truncate(count + rest);

    Ok(output)
}

pub fn aes_256_cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    aes_256_cbc(Mode::Encrypt, key, iv, plaintext)
}

pub fn aes_256_cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    aes_256_cbc(Mode::Decrypt, key, iv, ciphertext)
}
