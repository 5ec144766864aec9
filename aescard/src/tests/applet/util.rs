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

use crate::applet::util::*;
use crate::error::*;

#[test]
fn test_to_hex_string() {
    assert_eq!("AE 25 6C BC 00 01", to_hex_string(&[0xae, 0x25, 0x6c, 0xbc, 0x00, 0x01]));
    assert_eq!("", to_hex_string(&[]));
    assert_eq!("AE256CBC0001", to_hex(&[0xae, 0x25, 0x6c, 0xbc, 0x00, 0x01]));
}

#[test]
fn test_parse_hex() {
    let expected = vec![0xae, 0x25, 0x6c, 0xbc, 0x00, 0x01];
    assert_eq!(expected, parse_hex("ae256cbc0001").unwrap());
    assert_eq!(expected, parse_hex("AE256CBC0001").unwrap());
    assert_eq!(expected, parse_hex("  AE 25 6C BC 00 01\n").unwrap());
    assert!(parse_hex("").unwrap().is_empty());

    assert!(matches!(parse_hex("ae2"), Err(Error::HexDecode(_))));
    assert!(matches!(parse_hex("zz"), Err(Error::HexDecode(_))));
}

#[test]
fn test_parse_hex_exact() {
    assert_eq!(16, parse_hex_exact("IV", &"00".repeat(16), 16).unwrap().len());
    match parse_hex_exact("key", &"00".repeat(16), 32) {
        Err(Error::InvalidLength {
            what,
            expected,
            actual,
        }) => {
            assert_eq!("key", what);
            assert_eq!("32", expected);
            assert_eq!(16, actual);
        }
        other => panic!("expected InvalidLength, got {:?}", other),
    }
}

#[test]
fn test_to_utf8_ignoring_errors() {
    assert_eq!("hello", to_utf8_ignoring_errors(b"hello"));
    assert_eq!("", to_utf8_ignoring_errors(&[]));
    assert_eq!("caf\u{e9}", to_utf8_ignoring_errors("caf\u{e9}".as_bytes()));
    // Invalid bytes are dropped, not replaced with U+FFFD.
    assert_eq!("helo", to_utf8_ignoring_errors(&[0x68, 0x65, 0xff, 0x6c, 0x80, 0x6f]));
    assert_eq!("ab", to_utf8_ignoring_errors(&[0x61, 0xc3, 0x62]));
    // Including a multi-byte sequence cut off at the end.
    assert_eq!("ok", to_utf8_ignoring_errors(&[0x6f, 0x6b, 0xe2, 0x82]));
}

#[test]
fn test_maybe_prompt_provided() {
    assert_eq!(
        "hello world",
        maybe_prompt(Some("hello world"), "Enter plaintext: ", false).unwrap()
    );
}
