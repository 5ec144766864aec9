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

use super::hal::PcscTestStub;
use crate::applet::apdu::Apdu;
use crate::applet::hal::PcscHal;
use crate::applet::recording::*;
use crate::applet::sw::StatusWord;
use crate::applet::{Handle, State};
use crate::error::*;

fn select_recording() -> Recording {
    let mut recording = Recording::default();
    let select = Apdu::new_select().unwrap();
    recording.record(&select, &Ok((StatusWord::success(), vec![])));
    recording
}

#[test]
fn test_recording_serialization() {
    let mut recording = select_recording();
    let encrypt = Apdu::from_bytes(&[0x80, 0x20, 0x00, 0x00, 0x01, 0x00]).unwrap();
    recording.record(
        &encrypt,
        &Err(Error::Internal("transmit failed".to_owned())),
    );

    let decoded = Recording::from_bytes(&recording.to_bytes().unwrap()).unwrap();
    assert_eq!(2, decoded.0.len());
    assert_eq!(Apdu::new_select().unwrap().raw(), decoded.0[0].sent.as_slice());
    assert_eq!(
        Ok((StatusWord::success(), vec![])),
        decoded.0[0].received.clone()
    );
    assert_eq!(
        Err("internal error: transmit failed".to_owned()),
        decoded.0[1].received.clone()
    );
}

#[test]
fn test_recording_flush_and_open() {
    let path = std::env::temp_dir().join(format!(
        "aescard-recording-test-{}.msgpack",
        std::process::id()
    ));
    select_recording().flush(&path).unwrap();
    let recording = Recording::open(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    // A recording made against one card can be replayed against the stub.
    let stub = PcscTestStub::new().unwrap();
    stub.push_recording(recording);
    let mut handle = Handle::new_with_hal(stub);
    handle.connect(None).unwrap();
    assert_eq!(State::Selected, handle.state());
    assert!(handle.get_hal().no_recordings());
}
