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
use crate::applet::hal::*;
use crate::applet::recording::{Recording, RecordingEntry};
use crate::applet::sw::StatusWord;
use crate::error::*;
use std::collections::VecDeque;
use std::sync::Mutex;

pub const MOCK_READER: &'static str = "Mock Reader 00 00";

/// A HAL which replays scripted recordings, asserting that each APDU we send
/// is exactly the one the recording expects.
pub struct PcscTestStub {
    connected: bool,
    readers: Vec<String>,
    recordings: Mutex<VecDeque<Recording>>,
}

impl PcscTestStub {
    pub fn set_mock_readers(&mut self, readers: &[&str]) {
        self.readers = readers
            .iter()
            .map(|&r| -> String { r.to_owned() })
            .collect();
    }

    pub fn push_recording(&self, recording: Recording) -> &Self {
        self.recordings.lock().unwrap().push_back(recording);
        self
    }

    /// Script a single exchange: expect `sent`, and answer with the given
    /// status word and response data.
    pub fn push_exchange(&self, sent: &[u8], sw: u16, data: &[u8]) -> &Self {
        let mut recording = Recording::default();
        recording.0.push_back(RecordingEntry::new_ok(
            sent,
            StatusWord::new_from_value(sw),
            data,
        ));
        self.push_recording(recording)
    }

    pub fn no_recordings(&self) -> bool {
        self.recordings.lock().unwrap().is_empty()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl PcscHal for PcscTestStub {
    fn new() -> Result<Self> {
        Ok(PcscTestStub {
            connected: false,
            readers: vec![MOCK_READER.to_owned()],
            recordings: Mutex::new(VecDeque::new()),
        })
    }

    fn secure_random_bytes(&self, buf: &mut [u8]) -> Result<()> {
        for dst in buf.iter_mut() {
            *dst = 0xff;
        }
        Ok(())
    }

    fn cheap_random_bytes(&self, buf: &mut [u8]) -> Result<()> {
        self.secure_random_bytes(buf)
    }

    fn list_readers(&self) -> Result<Vec<String>> {
        Ok(self.readers.clone())
    }

    fn connect_impl(&mut self, _reader: &str) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn send_data_impl(&self, apdu: &Apdu) -> Result<(StatusWord, Vec<u8>)> {
        if !self.connected {
            return Err(Error::Internal(
                "can't send data without first being connected".to_owned(),
            ));
        }

        let mut recordings = self.recordings.lock().unwrap();
        let entry = match recordings.front_mut() {
            None => {
                return Err(Error::Internal(
                    "unexpected call to send_data_impl (no more mock recordings)".to_owned(),
                ));
            }
            Some(recording) => recording.0.pop_front().unwrap(),
        };
        if recordings.front().map_or(false, |r| r.0.is_empty()) {
            recordings.pop_front();
        }

        // Since expected_sent is for the assertion, we really do want to unwrap().
        let expected_sent = Apdu::from_bytes(entry.sent.as_slice()).unwrap();
        assert_eq!(
            &expected_sent, apdu,
            "device expected {:?}, got {:?}",
            expected_sent, apdu
        );

        match entry.received {
            Ok(v) => Ok(v),
            Err(msg) => Err(Error::Internal(msg)),
        }
    }

    fn begin_transaction(&self) -> Result<()> {
        if !self.connected {
            return Err(Error::Internal(
                "can't begin transaction without first being connected".to_owned(),
            ));
        }
        Ok(())
    }

    fn end_transaction(&self) -> Result<()> {
        if !self.connected {
            return Err(Error::Internal(
                "can't end transaction without first being connected".to_owned(),
            ));
        }
        Ok(())
    }
}

#[test]
fn test_connect_picks_matching_reader() {
    let mut stub = PcscTestStub::new().unwrap();
    stub.set_mock_readers(&["Alpha Reader 00 00", "Beta Reader 01 00"]);
    assert_eq!("Beta Reader 01 00", stub.connect(Some("Beta")).unwrap());
    assert!(stub.is_connected());
}

#[test]
fn test_connect_default_reader_is_first() {
    let mut stub = PcscTestStub::new().unwrap();
    stub.set_mock_readers(&["Alpha Reader 00 00", "Beta Reader 01 00"]);
    assert_eq!("Alpha Reader 00 00", stub.connect(None).unwrap());
}

#[test]
fn test_connect_errors() {
    let mut stub = PcscTestStub::new().unwrap();
    stub.set_mock_readers(&[]);
    assert!(matches!(stub.connect(None), Err(Error::NoReaders)));

    stub.set_mock_readers(&["Alpha Reader 00 00"]);
    match stub.connect(Some("Gamma")) {
        Err(Error::UnknownReader(r)) => assert_eq!("Gamma", r),
        other => panic!("expected UnknownReader, got {:?}", other),
    }
    assert!(!stub.is_connected());
}

#[test]
fn test_send_data_follows_get_response() {
    let mut stub = PcscTestStub::new().unwrap();
    stub.connect(None).unwrap();
    stub.push_exchange(&[0x80, 0x20, 0x00, 0x00, 0x01, 0xaa], 0x6104, &[0x01, 0x02])
        .push_exchange(&[0x00, 0xc0, 0x00, 0x00, 0x04], 0x6102, &[0x03, 0x04])
        .push_exchange(&[0x00, 0xc0, 0x00, 0x00, 0x02], 0x9000, &[0x05, 0x06]);

    let apdu = Apdu::from_bytes(&[0x80, 0x20, 0x00, 0x00, 0x01, 0xaa]).unwrap();
    let (sw, data) = stub.send_data(&apdu).unwrap();
    assert!(sw.is_success());
    assert_eq!(vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06], data);
    assert!(stub.no_recordings());
}

#[test]
fn test_send_data_requires_connection() {
    let stub = PcscTestStub::new().unwrap();
    let apdu = Apdu::new_select().unwrap();
    assert!(matches!(stub.send_data(&apdu), Err(Error::Internal(_))));
}

#[test]
fn test_send_data_caps_response_length() {
    let mut stub = PcscTestStub::new().unwrap();
    stub.connect(None).unwrap();
    stub.push_exchange(&[0x80, 0x20, 0x00, 0x00, 0x01, 0xaa], 0x6180, &[0x01; 128])
        .push_exchange(&[0x00, 0xc0, 0x00, 0x00, 0x80], 0x6180, &[0x02; 128])
        .push_exchange(&[0x00, 0xc0, 0x00, 0x00, 0x80], 0x6180, &[0x03; 128]);

    let apdu = Apdu::from_bytes(&[0x80, 0x20, 0x00, 0x00, 0x01, 0xaa]).unwrap();
    assert!(matches!(
        stub.send_data(&apdu),
        Err(Error::UnexpectedResponse(_))
    ));
    assert!(stub.no_recordings());
}

#[test]
fn test_send_data_caps_get_response_rounds() {
    let mut stub = PcscTestStub::new().unwrap();
    stub.connect(None).unwrap();
    stub.push_exchange(&[0x80, 0x20, 0x00, 0x00, 0x01, 0xaa], 0x6101, &[]);
    for _ in 0..MAX_GET_RESPONSE_ROUNDS {
        stub.push_exchange(&[0x00, 0xc0, 0x00, 0x00, 0x01], 0x6101, &[]);
    }

    let apdu = Apdu::from_bytes(&[0x80, 0x20, 0x00, 0x00, 0x01, 0xaa]).unwrap();
    assert!(matches!(
        stub.send_data(&apdu),
        Err(Error::UnexpectedResponse(_))
    ));
    // The last scripted GET RESPONSE was the final one sent.
    assert!(stub.no_recordings());
}
