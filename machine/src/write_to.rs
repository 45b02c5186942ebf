/*
 * SPDX-License-Identifier: MIT OR BlueOak-1.0.0
 * Copyright (c) 2020-2022 Andre Richter <andre.o.richter@gmail.com>
 * Original code distributed under MIT, additional changes are under BlueOak-1.0.0
 */

//! A `core::fmt::Write` sink over a fixed-size byte buffer, used to render
//! `format_args!` output into a NUL-terminated buffer for QEMU semihosting
//! (`SYS_WRITE0` takes a C string, not a length-prefixed one).

use core::{cmp::min, fmt};

pub struct WriteTo<'a> {
    buf: &'a mut [u8],
    used: usize,
}

impl<'a> WriteTo<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        WriteTo { buf, used: 0 }
    }

    pub fn as_str(self) -> Option<&'a str> {
        if self.used <= self.buf.len() {
            core::str::from_utf8(&self.buf[..self.used]).ok()
        } else {
            None
        }
    }
}

impl<'a> fmt::Write for WriteTo<'a> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.used >= self.buf.len() {
            return Err(fmt::Error);
        }
        let remaining = &mut self.buf[self.used..];
        let raw_s = s.as_bytes();
        let num_to_write = min(raw_s.len(), remaining.len());
        remaining[..num_to_write].copy_from_slice(&raw_s[..num_to_write]);

        self.used += raw_s.len();
        if num_to_write < raw_s.len() {
            Err(fmt::Error)
        } else {
            Ok(())
        }
    }
}

/// Render `args` into `buf`, terminate with a NUL byte, and return the
/// resulting C string's bytes (including the terminator) as `&str`. Panics
/// on buffer overflow; callers size `buf` generously since this is only
/// used on the QEMU test/semihosting path.
pub fn c_show<'a>(args: fmt::Arguments, buf: &'a mut [u8]) -> &'a str {
    use fmt::Write;

    let len = buf.len();
    let mut w = WriteTo::new(&mut buf[..len - 1]);
    let _ = w.write_fmt(args);
    let used = w.used;
    buf[used] = 0;
    core::str::from_utf8(&buf[..=used]).unwrap_or("<non-utf8>\0")
}
