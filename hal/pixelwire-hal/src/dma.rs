//! DMA channel abstractions
//!
//! A DMA-backed transport owns one [`DmaChannel`]. Completion is reported
//! by a shared interrupt: the handler reads [`ChannelStatus`] for every
//! registered channel and acknowledges the ones that finished.

/// One hardware DMA channel feeding an output peripheral
pub trait DmaChannel {
    /// Error type for channel operations
    type Error;

    /// Hardware channel number (index into the shared dispatch table)
    fn channel(&self) -> u8;

    /// Rebuild descriptors for a frame of `len` bytes
    ///
    /// Called whenever the frame size differs from the previous frame.
    fn prepare(&mut self, len: usize) -> Result<(), Self::Error>;

    /// Queue a transfer of `data` and return without waiting
    ///
    /// The caller keeps `data` untouched until the transfer completes.
    fn start(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Release the channel back to the platform
    fn release(&mut self) {}
}

/// Per-channel completion flags of a shared interrupt
pub trait ChannelStatus {
    /// Check whether `channel` has finished its transfer
    fn is_complete(&self, channel: u8) -> bool;

    /// Clear the completion flag of `channel`
    fn acknowledge(&mut self, channel: u8);
}

/// Enable control for an interrupt line shared by several channels
pub trait InterruptLine {
    /// Error type for interrupt controller calls
    type Error;

    /// Unmask the interrupt
    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Mask the interrupt
    fn disable(&mut self) -> Result<(), Self::Error>;
}
