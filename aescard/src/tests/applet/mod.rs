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

mod hal;
mod recording;
mod sw;
mod util;

use crate::applet::Instruction;

#[test]
fn test_instruction_codes() {
    assert_eq!((0x00, 0xa4, 0x04), {
        let i = Instruction::Select;
        (i.cla(), i.ins(), i.p1())
    });
    assert_eq!(0x10, Instruction::SetKey.ins());
    assert_eq!(0x11, Instruction::SetIv.ins());
    assert_eq!(0x20, Instruction::Encrypt.ins());
    assert_eq!(0x30, Instruction::Decrypt.ins());
    for i in &[
        Instruction::SetKey,
        Instruction::SetIv,
        Instruction::Encrypt,
        Instruction::Decrypt,
    ] {
        assert_eq!(0x80, i.cla());
        assert_eq!(0x00, i.p1());
        assert_eq!(Some(*i), Instruction::from_bytes(i.cla(), i.ins()));
    }
    assert_eq!(None, Instruction::from_bytes(0x00, 0x20));
    assert_eq!("SET_KEY", Instruction::SetKey.to_string());
}
