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

//! PKCS#7 padding. The applet runs CBC without padding, so messages are padded
//! before they are sent for encryption, and unpadded after decryption.

use crate::applet::BLOCK_BYTES;
use crate::error::*;

fn check_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 || block_size > u8::MAX as usize {
        return Err(Error::InvalidArgument(format!(
            "PKCS#7 block size must be between 1 and {}, got {}",
            u8::MAX,
            block_size
        )));
    }
    Ok(())
}

/// Pad the given data up to a multiple of `block_size`. Between 1 and
/// `block_size` bytes are always appended, so already-aligned data gains a
/// full block.
pub fn pad_to(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
    check_block_size(block_size)?;
    let pad_len = block_size - (data.len() % block_size);
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    Ok(padded)
}

/// Pad the given data up to a multiple of the AES block size.
pub fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_BYTES - (data.len() % BLOCK_BYTES);
    let mut padded = data.to_vec();
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

/// Strip PKCS#7 padding for the given block size. Unlike some
/// implementations, invalid padding is an error rather than being passed
/// through: the final byte must be between 1 and `block_size`, and that many
/// trailing bytes must all be equal to it.
pub fn unpad_from(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
    check_block_size(block_size)?;
    let pad_len = match data.last() {
        None => return Err(Error::InvalidPadding),
        Some(&b) => b as usize,
    };
    if pad_len == 0 || pad_len > block_size || pad_len > data.len() {
        return Err(Error::InvalidPadding);
    }

    let (unpadded, padding) = data.split_at(data.len() - pad_len);
    if padding.iter().any(|&b| b as usize != pad_len) {
        return Err(Error::InvalidPadding);
    }
    Ok(unpadded.to_vec())
}

/// Strip PKCS#7 padding for the AES block size.
pub fn unpad(data: &[u8]) -> Result<Vec<u8>> {
    unpad_from(data, BLOCK_BYTES)
}
