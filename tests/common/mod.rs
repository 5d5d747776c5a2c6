//! Shared test double: a transport that records every write and replays
//! canned read responses.

#![allow(dead_code)]

use mpsse_bridge::{opcode, BitMode, Error, Mpsse, MpsseConfig, Result, Transport};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MockState {
    pub writes: Vec<Vec<u8>>,
    pub responses: VecDeque<Vec<u8>>,
    pub reads: usize,
    /// When set, every write reports this many bytes accepted.
    pub short_write: Option<usize>,
    /// When set, the write with this index (counting recorded writes) fails
    /// with an I/O error and is not recorded.
    pub fail_write_at: Option<usize>,
    pub bitmode: Option<(u8, BitMode)>,
    pub chunk_size: Option<u32>,
    pub pacing: Option<u32>,
    pub closed: bool,
}

/// Cheap to clone; clones share the same state so a test can keep one
/// while the driver owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, bytes: &[u8]) {
        self.state.borrow_mut().responses.push_back(bytes.to_vec());
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.borrow().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }

    pub fn reads(&self) -> usize {
        self.state.borrow().reads
    }

    pub fn state(&self) -> std::cell::Ref<'_, MockState> {
        self.state.borrow()
    }

    pub fn set_short_write(&self, accepted: Option<usize>) {
        self.state.borrow_mut().short_write = accepted;
    }

    /// Fails the `n`th write from now (0 = the next one).
    pub fn fail_write_after(&self, n: usize) {
        let mut state = self.state.borrow_mut();
        state.fail_write_at = Some(state.writes.len() + n);
    }

    /// Writes that are 6-byte GPIO bank pushes.
    pub fn gpio_pushes(&self) -> Vec<Vec<u8>> {
        self.writes()
            .into_iter()
            .filter(|w| is_gpio_push(w))
            .collect()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut state = self.state.borrow_mut();
        if state.fail_write_at == Some(state.writes.len()) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "USB write failed",
            )));
        }
        state.writes.push(data.to_vec());
        Ok(state.short_write.unwrap_or(data.len()))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.state.borrow_mut();
        state.reads += 1;
        match state.responses.pop_front() {
            Some(response) => {
                let n = response.len().min(buf.len());
                buf[..n].copy_from_slice(&response[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }

    fn set_bitmode(&mut self, mask: u8, mode: BitMode) -> Result<()> {
        self.state.borrow_mut().bitmode = Some((mask, mode));
        Ok(())
    }

    fn set_chunk_size(&mut self, size: u32) -> Result<()> {
        self.state.borrow_mut().chunk_size = Some(size);
        Ok(())
    }

    fn set_pacing(&mut self, hz: u32) -> Result<()> {
        self.state.borrow_mut().pacing = Some(hz);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.borrow_mut().closed = true;
        Ok(())
    }
}

pub fn is_gpio_push(write: &[u8]) -> bool {
    write.len() == 6 && write[0] == opcode::SET_BITS_LOW && write[3] == opcode::SET_BITS_HIGH
}

/// The bank push for a given direction/level pair.
pub fn gpio_push(direction: u16, level: u16) -> Vec<u8> {
    let [dir_low, dir_high] = direction.to_le_bytes();
    let [level_low, level_high] = level.to_le_bytes();
    vec![
        opcode::SET_BITS_LOW,
        level_low,
        dir_low,
        opcode::SET_BITS_HIGH,
        level_high,
        dir_high,
    ]
}

/// Short poll deadline so timeout tests finish quickly.
pub fn fast_config() -> MpsseConfig {
    MpsseConfig {
        poll_timeout: Duration::from_millis(50),
        ..MpsseConfig::default()
    }
}

/// An engine that has completed bring-up, with the bring-up writes cleared.
pub fn open_mpsse(mock: &MockTransport) -> Mpsse<MockTransport> {
    open_mpsse_with(mock, fast_config())
}

pub fn open_mpsse_with(mock: &MockTransport, config: MpsseConfig) -> Mpsse<MockTransport> {
    mock.push_response(&opcode::BAD_COMMAND_ECHO);
    let mpsse = Mpsse::open(mock.clone(), config).expect("bring-up against mock");
    mock.clear_writes();
    mpsse
}
