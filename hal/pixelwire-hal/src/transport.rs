//! Transport contract
//!
//! A transport moves raw bytes to a physical or virtual sink. Protocols
//! bracket each frame with [`Transport::begin_transaction`] and
//! [`Transport::end_transaction`] and hand over the encoded frame in
//! between.
//!
//! Transports never report errors to their protocol. A failing transport
//! drops the data and carries on; polling [`Transport::is_ready_to_update`]
//! is the only feedback channel.

/// Byte sink driven by a protocol
///
/// Clocked transports write synchronously and are ready again as soon as
/// `transmit_bytes` returns. DMA-backed transports queue the bytes and
/// report readiness once the hardware has finished and the chip's
/// reset interval has elapsed.
pub trait Transport {
    /// One-time hardware bring-up
    fn begin(&mut self);

    /// Open a frame, applying the peripheral clock rate and mode
    fn begin_transaction(&mut self);

    /// Write (or queue) the bytes of the current frame
    fn transmit_bytes(&mut self, bytes: &[u8]);

    /// Close the current frame
    fn end_transaction(&mut self);

    /// Check whether a new frame may start without disturbing the last one
    fn is_ready_to_update(&self) -> bool {
        true
    }
}

/// Borrowed transports
///
/// A protocol holding `&mut T` drives a transport whose lifetime is owned
/// by the caller.
impl<T: Transport + ?Sized> Transport for &mut T {
    fn begin(&mut self) {
        (**self).begin();
    }

    fn begin_transaction(&mut self) {
        (**self).begin_transaction();
    }

    fn transmit_bytes(&mut self, bytes: &[u8]) {
        (**self).transmit_bytes(bytes);
    }

    fn end_transaction(&mut self) {
        (**self).end_transaction();
    }

    fn is_ready_to_update(&self) -> bool {
        (**self).is_ready_to_update()
    }
}
