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

use crate::applet::sw::*;
use crate::applet::Instruction;
use crate::error::*;

#[test]
fn test_status_word_parsing() {
    let sw = StatusWord::new(&[0x01, 0x02, 0x90, 0x00]);
    assert!(sw.is_success());
    assert_eq!((0x90, 0x00), (sw.sw1(), sw.sw2()));
    assert_eq!(None, sw.bytes_remaining);
    assert_eq!("9000", sw.to_string());

    let sw = StatusWord::new(&[0x6a, 0x82]);
    assert!(!sw.is_success());
    assert_eq!(0x6a82, sw.value);
    assert_eq!("Applet or file not found", sw.description());

    // Too short to contain a status word at all.
    assert!(!StatusWord::new(&[0x90]).is_success());
}

#[test]
fn test_bytes_remaining() {
    let sw = StatusWord::new_from_bytes(0x61, 0x20);
    assert_eq!(Some(0x20), sw.bytes_remaining);
    assert!(!sw.is_success());
    assert_eq!(None, StatusWord::new_from_value(0x6700).bytes_remaining);
}

#[test]
fn test_check() {
    assert!(StatusWord::success().check(Instruction::SetKey).is_ok());
    match StatusWord::new_from_value(0x6d00).check(Instruction::Encrypt) {
        Err(e @ Error::CommandFailed { .. }) => {
            assert_eq!("ENCRYPT failed: SW1SW2 = 6D00", e.to_string());
        }
        other => panic!("expected CommandFailed, got {:?}", other),
    }
}

#[test]
fn test_descriptions() {
    assert_eq!("Wrong length", StatusWord::new_from_value(0x6700).description());
    assert_eq!(
        "Class not supported",
        StatusWord::new_from_value(0x6e00).description()
    );
    assert_eq!(
        "Unknown status word",
        StatusWord::new_from_value(0x1234).description()
    );
}
