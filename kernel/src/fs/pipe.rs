/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! Anonymous pipes: a fixed-size ring buffer with independent reader and
//! writer wake-up rendezvous. A reader blocks on empty, a writer blocks
//! on full; closing either end wakes the other so it can observe EOF
//! (`reader_count == 0`) or EPIPE (`writer_count == 0`) instead of
//! sleeping forever.

use crate::proc::rendez::Rendez;
use alloc::vec::Vec;

pub const PIPE_CAPACITY: usize = 4096;

pub struct Pipe {
    buffer: Vec<u8>,
    head: usize,
    len: usize,
    pub reader_count: u32,
    pub writer_count: u32,
    pub read_rendez: Rendez,
    pub write_rendez: Rendez,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PipeError {
    WouldBlock,
    BrokenPipe,
}

impl Pipe {
    pub fn new() -> Self {
        Self {
            buffer: alloc::vec![0u8; PIPE_CAPACITY],
            head: 0,
            len: 0,
            reader_count: 1,
            writer_count: 1,
            read_rendez: Rendez::new(),
            write_rendez: Rendez::new(),
        }
    }

    fn tail(&self) -> usize {
        (self.head + self.len) % PIPE_CAPACITY
    }

    /// `read_from_pipe`: copy up to `out.len()` bytes, blocking while
    /// empty and at least one writer remains open. Returns `Ok(0)` on
    /// EOF (no data, no writers) rather than blocking forever.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize, PipeError> {
        loop {
            if self.len > 0 {
                let n = out.len().min(self.len);
                for i in 0..n {
                    out[i] = self.buffer[(self.head + i) % PIPE_CAPACITY];
                }
                self.head = (self.head + n) % PIPE_CAPACITY;
                self.len -= n;
                self.write_rendez.wakeup_all();
                return Ok(n);
            }
            if self.writer_count == 0 {
                return Ok(0);
            }
            self.read_rendez.task_sleep();
        }
    }

    /// `write_to_pipe`: copy up to `in_.len()` bytes, blocking while full
    /// and at least one reader remains open. Returns `EPIPE` once every
    /// reader has closed, matching a dead pipe rather than blocking.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, PipeError> {
        loop {
            if self.reader_count == 0 {
                return Err(PipeError::BrokenPipe);
            }
            let free = PIPE_CAPACITY - self.len;
            if free > 0 {
                let n = data.len().min(free);
                let tail = self.tail();
                for i in 0..n {
                    self.buffer[(tail + i) % PIPE_CAPACITY] = data[i];
                }
                self.len += n;
                self.read_rendez.wakeup_all();
                return Ok(n);
            }
            self.write_rendez.task_sleep();
        }
    }

    pub fn close_reader(&mut self) {
        self.reader_count = self.reader_count.saturating_sub(1);
        if self.reader_count == 0 {
            self.write_rendez.wakeup_all();
        }
    }

    pub fn close_writer(&mut self) {
        self.writer_count = self.writer_count.saturating_sub(1);
        if self.writer_count == 0 {
            self.read_rendez.wakeup_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn write_then_read_round_trips_and_reports_eof_after_writer_closes() {
        let mut pipe = Pipe::new();
        assert_eq!(pipe.write(b"hi").unwrap(), 2);
        let mut out = [0u8; 2];
        assert_eq!(pipe.read(&mut out).unwrap(), 2);
        assert_eq!(&out, b"hi");
        pipe.close_writer();
        let mut out2 = [0u8; 2];
        assert_eq!(pipe.read(&mut out2).unwrap(), 0);
    }

    #[test_case]
    fn write_after_readers_closed_returns_broken_pipe() {
        let mut pipe = Pipe::new();
        pipe.close_reader();
        assert_eq!(pipe.write(b"x"), Err(PipeError::BrokenPipe));
    }
}
