//! Textual debug transport
//!
//! Prints every bus operation to a [`core::fmt::Write`] sink, one per line:
//!
//! ```text
//! begin
//! beginTransaction
//! transmit 00 00 00 00 ff 10 20 30
//! endTransaction
//! ```
//!
//! Wire formats can be checked on the host without hardware. Wrapping a
//! real transport prints and forwards.

use core::fmt::Write;

use pixelwire_hal::Transport;

/// Transport that accepts and discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn begin(&mut self) {}

    fn begin_transaction(&mut self) {}

    fn transmit_bytes(&mut self, _bytes: &[u8]) {}

    fn end_transaction(&mut self) {}
}

/// Transport printing each operation, optionally forwarding it
pub struct DebugTransport<W, T = NullTransport> {
    out: W,
    inner: T,
}

impl<W: Write> DebugTransport<W, NullTransport> {
    /// Print-only sink
    pub fn new(out: W) -> Self {
        Self {
            out,
            inner: NullTransport,
        }
    }
}

impl<W: Write, T: Transport> DebugTransport<W, T> {
    /// Print every operation, then forward it to `inner`
    pub fn wrapping(out: W, inner: T) -> Self {
        Self { out, inner }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Release the sink and the wrapped transport
    pub fn free(self) -> (W, T) {
        (self.out, self.inner)
    }
}

impl<W: Write, T: Transport> Transport for DebugTransport<W, T> {
    fn begin(&mut self) {
        let _ = writeln!(self.out, "begin");
        self.inner.begin();
    }

    fn begin_transaction(&mut self) {
        let _ = writeln!(self.out, "beginTransaction");
        self.inner.begin_transaction();
    }

    fn transmit_bytes(&mut self, bytes: &[u8]) {
        let _ = write!(self.out, "transmit");
        for byte in bytes {
            let _ = write!(self.out, " {:02x}", byte);
        }
        let _ = writeln!(self.out);
        self.inner.transmit_bytes(bytes);
    }

    fn end_transaction(&mut self) {
        let _ = writeln!(self.out, "endTransaction");
        self.inner.end_transaction();
    }

    fn is_ready_to_update(&self) -> bool {
        self.inner.is_ready_to_update()
    }
}
