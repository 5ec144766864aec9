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

use crate::error::*;
use bdrck::cli;

/// Format bytes as space-separated uppercase hex pairs, e.g. "AE 25 6C".
pub fn to_hex_string(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<String>>()
        .join(" ")
}

/// Format bytes as a single run of uppercase hex digits, e.g. "AE256C".
pub fn to_hex(data: &[u8]) -> String {
    data_encoding::HEXUPPER.encode(data)
}

/// Decode a hex string. Either case is accepted, and whitespace anywhere in the
/// input (e.g. between byte pairs, as `to_hex_string` produces) is ignored.
pub fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(data_encoding::HEXLOWER_PERMISSIVE.decode(compact.as_bytes())?)
}

/// Decode a hex string which must contain exactly `len` bytes.
pub fn parse_hex_exact(what: &'static str, s: &str, len: usize) -> Result<Vec<u8>> {
    let data = parse_hex(s)?;
    if data.len() != len {
        return Err(Error::InvalidLength {
            what: what,
            expected: len.to_string(),
            actual: data.len(),
        });
    }
    Ok(data)
}

/// Return the provided value, or if none was provided prompt for one on the
/// terminal. Sensitive values (keys) are read without echoing them.
/// Decode the given bytes as UTF-8, dropping any invalid sequences rather than
/// replacing them.
pub fn to_utf8_ignoring_errors(data: &[u8]) -> String {
    let mut decoded = String::with_capacity(data.len());
    let mut rest = data;
    loop {
        match std::str::from_utf8(rest) {
            Ok(s) => {
                decoded.push_str(s);
                return decoded;
            }
            Err(e) => {
                let (valid, invalid) = rest.split_at(e.valid_up_to());
                decoded.push_str(&String::from_utf8_lossy(valid));
                // A truncated sequence at the very end has no error length.
                rest = &invalid[e.error_len().unwrap_or(invalid.len())..];
            }
        }
    }
}

pub fn maybe_prompt(provided: Option<&str>, prompt: &str, sensitive: bool) -> Result<String> {
    let string = cli::MaybePromptedString::new(
        provided,
        cli::Stream::Stdin,
        cli::Stream::Stderr,
        prompt,
        sensitive,
        false,
    )?;
    Ok(string.into_inner())
}
