//! DMA completion tracking
//!
//! Each DMA channel carries a three-state tracker shared between the
//! cooperative send path and the channel's completion interrupt:
//!
//! ```text
//!            set_sending                dma_finished (ISR)
//!   Idle ─────────────────► Sending ─────────────────────► DmaCompleted
//!    ▲                        │                                 │
//!    │          abort         │   is_ready_to_send, reset done  │
//!    └────────────────────────┴─────────────────────────────────┘
//! ```
//!
//! A channel is ready only once the chip's reset (latch) interval has
//! elapsed after the last byte left the peripheral. The interrupt side
//! writes the timestamp before publishing the state, so the cooperative
//! side always compares against the matching completion time.

use portable_atomic::{AtomicU32, AtomicU8, Ordering};

use pixelwire_hal::{ChannelStatus, InterruptLine};

/// Transfer state of one DMA channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompletionState {
    /// A transfer is in flight
    Sending,
    /// The transfer finished; waiting out the reset interval
    DmaCompleted,
    /// Ready for the next transfer
    Idle,
}

impl CompletionState {
    const fn as_u8(self) -> u8 {
        match self {
            CompletionState::Sending => 0,
            CompletionState::DmaCompleted => 1,
            CompletionState::Idle => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => CompletionState::Sending,
            1 => CompletionState::DmaCompleted,
            _ => CompletionState::Idle,
        }
    }
}

/// Completion state shared between a channel's sender and its interrupt
#[derive(Debug)]
pub struct CompletionTracker {
    channel: u8,
    state: AtomicU8,
    completed_at_us: AtomicU32,
}

impl CompletionTracker {
    /// Create an idle tracker for `channel`
    pub const fn new(channel: u8) -> Self {
        Self {
            channel,
            state: AtomicU8::new(CompletionState::Idle.as_u8()),
            completed_at_us: AtomicU32::new(0),
        }
    }

    /// DMA channel this tracker belongs to
    pub const fn channel(&self) -> u8 {
        self.channel
    }

    /// Mark a transfer as in flight
    ///
    /// Called just before the transfer is started, never from an interrupt.
    pub fn set_sending(&self) {
        self.state.store(CompletionState::Sending.as_u8(), Ordering::Release);
    }

    /// Record the end of a transfer at `now_us`
    ///
    /// Interrupt context only. A call without a transfer in flight is
    /// ignored.
    pub fn dma_finished(&self, now_us: u32) {
        if self.state.load(Ordering::Acquire) != CompletionState::Sending.as_u8() {
            return;
        }
        self.completed_at_us.store(now_us, Ordering::Relaxed);
        self.state
            .store(CompletionState::DmaCompleted.as_u8(), Ordering::Release);
    }

    /// Check whether the channel may start a new transfer
    ///
    /// Cooperative context only. Moves `DmaCompleted` to `Idle` once
    /// `reset_us` has elapsed since completion; the clock may wrap.
    pub fn is_ready_to_send(&self, reset_us: u32, now_us: u32) -> bool {
        match CompletionState::from_u8(self.state.load(Ordering::Acquire)) {
            CompletionState::Sending => false,
            CompletionState::Idle => true,
            CompletionState::DmaCompleted => {
                let completed_at = self.completed_at_us.load(Ordering::Relaxed);
                if now_us.wrapping_sub(completed_at) < reset_us {
                    return false;
                }
                // Only this side leaves DmaCompleted, so a lost race means
                // another cooperative caller already moved it to Idle.
                let _ = self.state.compare_exchange(
                    CompletionState::DmaCompleted.as_u8(),
                    CompletionState::Idle.as_u8(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                true
            }
        }
    }

    /// Revert a transfer the hardware refused to start
    pub fn abort(&self) {
        let _ = self.state.compare_exchange(
            CompletionState::Sending.as_u8(),
            CompletionState::Idle.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Current state snapshot
    pub fn state(&self) -> CompletionState {
        CompletionState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Dispatch table errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// The tracker's channel has no slot in this table
    ChannelOutOfRange,
    /// Another tracker already owns the channel's slot
    SlotOccupied,
}

/// Routes a shared completion interrupt to per-channel trackers
///
/// Slots are indexed by channel number. The interrupt line is enabled
/// while at least one tracker is registered.
///
/// Registration takes `&mut self` and belongs to setup and teardown. Once
/// the channels are registered, the table is handed to the interrupt
/// handler by shared reference (typically a `&'static`) and
/// [`on_interrupt`](Self::on_interrupt) reads it without locking. To change
/// registrations later, take the table back from the handler first.
pub struct CompletionDispatch<'a, L: InterruptLine, const N: usize> {
    line: L,
    slots: [Option<&'a CompletionTracker>; N],
    registered: usize,
}

impl<'a, L: InterruptLine, const N: usize> CompletionDispatch<'a, L, N> {
    pub fn new(line: L) -> Self {
        Self {
            line,
            slots: [None; N],
            registered: 0,
        }
    }

    /// Attach `tracker` to its channel's slot
    ///
    /// # Panics
    ///
    /// Panics if this is the first registration and the interrupt line
    /// cannot be enabled. Sends could never complete otherwise.
    pub fn register(&mut self, tracker: &'a CompletionTracker) -> Result<(), DispatchError> {
        let slot = self
            .slots
            .get_mut(usize::from(tracker.channel()))
            .ok_or(DispatchError::ChannelOutOfRange)?;
        if slot.is_some() {
            return Err(DispatchError::SlotOccupied);
        }

        if self.registered == 0 && self.line.enable().is_err() {
            panic!("DMA completion interrupt could not be enabled");
        }

        *slot = Some(tracker);
        self.registered += 1;
        debug!("DMA channel {} registered", tracker.channel());
        Ok(())
    }

    /// Detach the tracker on `channel`, if any
    ///
    /// # Panics
    ///
    /// Panics if the last slot empties and the interrupt line cannot be
    /// disabled.
    pub fn unregister(&mut self, channel: u8) {
        let Some(slot) = self.slots.get_mut(usize::from(channel)) else {
            return;
        };
        if slot.take().is_none() {
            return;
        }

        self.registered -= 1;
        debug!("DMA channel {} unregistered", channel);
        if self.registered == 0 && self.line.disable().is_err() {
            panic!("DMA completion interrupt could not be disabled");
        }
    }

    /// Number of registered trackers
    pub fn registered(&self) -> usize {
        self.registered
    }

    /// Interrupt handler body
    ///
    /// Acknowledges and completes every registered channel whose status
    /// reports completion. Does not allocate or lock.
    pub fn on_interrupt(&self, status: &mut impl ChannelStatus, now_us: u32) {
        for tracker in self.slots.iter().flatten() {
            let channel = tracker.channel();
            if status.is_complete(channel) {
                status.acknowledge(channel);
                tracker.dma_finished(now_us);
            }
        }
    }
}
