//! Lane multiplexing over a parallel-output peripheral
//!
//! Several logical LED strings (lanes) share one parallel DMA engine. Each
//! lane owns one bit of every sample word; a frame is a single transfer of
//! the interleaved sample buffer.
//!
//! # Strict sync
//!
//! ```text
//! lane 0: begin ─ write ─ end ──┐
//! lane 1: begin ─ write ─ end ──┼──► all registered lanes written and ended
//! lane 2: begin ─ write ─ end ──┘          │
//!                                          ▼
//!                                one transfer, masks reset
//! ```
//!
//! The transfer is issued only when every registered lane has written and
//! ended in the current window. A registered lane that never shows holds
//! the others back indefinitely; there is no timeout.
//!
//! Cooperative code may wait for the previous transfer (busy-poll on the
//! shared [`CompletionTracker`]), but never while holding the state lock.

use alloc::vec::Vec;
use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec as BoundedVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use pixelwire_hal::{LaneWidth, MicrosClock, MuxPeripheral, Transport};

use crate::completion::CompletionTracker;
use crate::encoding::{clear_lane, BitPattern};

/// Identity of one physical parallel peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeripheralId(pub u8);

/// Bit position of a registered lane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LaneId(u8);

impl LaneId {
    /// Lane bit position within a sample word
    pub const fn index(self) -> u8 {
        self.0
    }

    const fn mask(self) -> u16 {
        1 << self.0
    }
}

/// Lane multiplexing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LaneError {
    /// The shared sample buffer could not grow
    OutOfMemory,
    /// Every lane of the peripheral is taken
    NoFreeLane,
    /// The lane is not registered on this peripheral
    NotRegistered,
    /// A mux for this peripheral is already in the set
    DuplicatePeripheral,
    /// The set has no room for another peripheral
    SetFull,
}

/// Static configuration of one multiplexed peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MuxConfig {
    /// Lanes per sample word
    pub width: LaneWidth,
    /// Self-clocking encoding shared by every lane
    pub pattern: BitPattern,
    /// Latch interval after each transfer (µs)
    pub reset_us: u32,
}

/// Lanes of the widest peripheral
const MAX_LANES: usize = 16;

/// Frame window and buffer, alive while at least one lane is registered
struct MuxState {
    registered: u16,
    begun: u16,
    written: u16,
    ended: u16,
    /// Registered frame length per lane
    frame_bytes: [usize; MAX_LANES],
    buffer: Vec<u8>,
}

impl MuxState {
    const fn new() -> Self {
        Self {
            registered: 0,
            begun: 0,
            written: 0,
            ended: 0,
            frame_bytes: [0; MAX_LANES],
            buffer: Vec::new(),
        }
    }

    fn grow(&mut self, len: usize) -> Result<(), LaneError> {
        let current = self.buffer.len();
        if len <= current {
            return Ok(());
        }
        self.buffer
            .try_reserve_exact(len - current)
            .map_err(|_| LaneError::OutOfMemory)?;
        self.buffer.resize(len, 0);
        debug!("lane buffer grown from {} to {} bytes", current, len);
        Ok(())
    }

    fn reset_window(&mut self) {
        self.begun = 0;
        self.written = 0;
        self.ended = 0;
    }
}

struct Inner<P> {
    peripheral: P,
    state: Option<MuxState>,
    transfers: u32,
}

/// Strict-sync barrier over one parallel-output peripheral
pub struct LaneMux<'a, P: MuxPeripheral, K: MicrosClock> {
    id: PeripheralId,
    config: MuxConfig,
    tracker: &'a CompletionTracker,
    clock: K,
    inner: Mutex<CriticalSectionRawMutex, RefCell<Inner<P>>>,
}

impl<'a, P: MuxPeripheral, K: MicrosClock> LaneMux<'a, P, K> {
    /// Create a mux; the peripheral stays down until the first lane registers
    pub fn new(
        id: PeripheralId,
        config: MuxConfig,
        peripheral: P,
        tracker: &'a CompletionTracker,
        clock: K,
    ) -> Self {
        Self {
            id,
            config,
            tracker,
            clock,
            inner: Mutex::new(RefCell::new(Inner {
                peripheral,
                state: None,
                transfers: 0,
            })),
        }
    }

    pub fn id(&self) -> PeripheralId {
        self.id
    }

    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    /// Sample buffer bytes needed for a lane frame of `frame_bytes`
    pub fn buffer_len_for(&self, frame_bytes: usize) -> usize {
        let samples = self.config.pattern.encoded_bits(frame_bytes);
        (samples * self.config.width.sample_bytes()).next_multiple_of(4)
    }

    /// Register a lane sending `frame_bytes` per frame
    ///
    /// The first registration initializes the peripheral. The shared buffer
    /// grows to fit the largest registered frame.
    ///
    /// # Panics
    ///
    /// Panics if the peripheral cannot be initialized.
    pub fn register(&self, frame_bytes: usize) -> Result<LaneId, LaneError> {
        let needed = self.buffer_len_for(frame_bytes);
        self.wait_for_transfer();

        let lane = self.inner.lock(|cell| {
            let mut guard = cell.borrow_mut();
            let Inner {
                peripheral, state, ..
            } = &mut *guard;

            let fresh = state.is_none();
            let shared = state.get_or_insert_with(MuxState::new);
            let lane = (0..self.config.width.lanes())
                .find(|&l| shared.registered & (1 << l) == 0)
                .map(LaneId)
                .ok_or(LaneError::NoFreeLane)?;

            if let Err(e) = shared.grow(needed) {
                warn!("lane registration failed: buffer of {} bytes", needed);
                if fresh {
                    *state = None;
                }
                return Err(e);
            }
            shared.registered |= lane.mask();
            shared.frame_bytes[usize::from(lane.0)] = frame_bytes;

            if fresh {
                if peripheral.init(self.config.width).is_err() {
                    panic!("lane peripheral could not be initialized");
                }
                debug!("lane peripheral {} initialized", self.id.0);
            }
            Ok(lane)
        })?;

        debug!("lane {} registered on peripheral {}", lane.0, self.id.0);
        Ok(lane)
    }

    /// Remove `lane` from every mask and from the sample buffer
    ///
    /// The last unregistration tears the peripheral down and frees the
    /// buffer. Remaining lanes that already ended keep waiting for their
    /// next show.
    ///
    /// # Panics
    ///
    /// Panics if the peripheral cannot be deinitialized.
    pub fn unregister(&self, lane: LaneId) {
        self.wait_for_transfer();
        let sample_bytes = self.config.width.sample_bytes();

        self.inner.lock(|cell| {
            let mut guard = cell.borrow_mut();
            let Inner {
                peripheral, state, ..
            } = &mut *guard;

            let Some(shared) = state.as_mut() else {
                return;
            };
            if shared.registered & lane.mask() == 0 {
                return;
            }

            let keep = !lane.mask();
            shared.registered &= keep;
            shared.begun &= keep;
            shared.written &= keep;
            shared.ended &= keep;
            shared.frame_bytes[usize::from(lane.0)] = 0;
            clear_lane(&mut shared.buffer, lane.0, sample_bytes);
            debug!("lane {} unregistered from peripheral {}", lane.0, self.id.0);

            if shared.registered == 0 {
                *state = None;
                if peripheral.deinit().is_err() {
                    panic!("lane peripheral could not be deinitialized");
                }
                debug!("lane peripheral {} torn down", self.id.0);
            }
        });
    }

    /// Open `lane`'s frame window
    ///
    /// When no lane has started the current window, waits for the previous
    /// transfer and zero-fills the buffer.
    pub fn begin(&self, lane: LaneId) -> Result<(), LaneError> {
        if self.is_fresh_window() {
            self.wait_for_transfer();
        }

        self.with_lane(lane, |shared| {
            if shared.begun == 0 && shared.written == 0 {
                shared.buffer.fill(0);
            }
            shared.begun |= lane.mask();
        })
    }

    /// Interleave `payload` into `lane`'s bit position
    ///
    /// A second write in the same window replaces the lane's earlier bits.
    /// Bytes past the lane's registered frame are dropped.
    pub fn write(&self, lane: LaneId, payload: &[u8]) -> Result<(), LaneError> {
        let sample_bytes = self.config.width.sample_bytes();
        let pattern = self.config.pattern;

        self.with_lane(lane, |shared| {
            if shared.written & lane.mask() != 0 {
                clear_lane(&mut shared.buffer, lane.0, sample_bytes);
            }
            let limit = shared.frame_bytes[usize::from(lane.0)];
            let payload = &payload[..payload.len().min(limit)];
            pattern.encode_into_lane(payload, &mut shared.buffer, lane.0, sample_bytes);
            shared.written |= lane.mask();
        })
    }

    /// Close `lane`'s frame window
    ///
    /// Issues the transfer once every registered lane has written and ended.
    pub fn end(&self, lane: LaneId) -> Result<(), LaneError> {
        self.inner.lock(|cell| {
            let mut guard = cell.borrow_mut();
            let Inner {
                peripheral,
                state,
                transfers,
            } = &mut *guard;

            let shared = state
                .as_mut()
                .filter(|s| s.registered & lane.mask() != 0)
                .ok_or(LaneError::NotRegistered)?;
            shared.ended |= lane.mask();

            if shared.written != shared.registered || shared.ended != shared.registered {
                return Ok(());
            }

            self.tracker.set_sending();
            match peripheral.start(&shared.buffer) {
                Ok(()) => {
                    *transfers = transfers.wrapping_add(1);
                    trace!(
                        "lane transfer {} issued on peripheral {}",
                        *transfers,
                        self.id.0
                    );
                }
                Err(_) => {
                    self.tracker.abort();
                    warn!("lane peripheral {} refused transfer", self.id.0);
                }
            }
            shared.reset_window();
            Ok(())
        })
    }

    /// Check whether the previous transfer and its reset interval are over
    pub fn is_ready(&self) -> bool {
        self.tracker
            .is_ready_to_send(self.config.reset_us, self.clock.now_us())
    }

    /// Bits of all registered lanes
    pub fn registered_mask(&self) -> u16 {
        self.inner
            .lock(|cell| cell.borrow().state.as_ref().map_or(0, |s| s.registered))
    }

    /// Transfers issued since creation
    pub fn transfers_issued(&self) -> u32 {
        self.inner.lock(|cell| cell.borrow().transfers)
    }

    /// Current sample buffer length, 0 while no lane is registered
    pub fn buffer_len(&self) -> usize {
        self.inner
            .lock(|cell| cell.borrow().state.as_ref().map_or(0, |s| s.buffer.len()))
    }

    fn is_fresh_window(&self) -> bool {
        self.inner.lock(|cell| {
            cell.borrow()
                .state
                .as_ref()
                .is_some_and(|s| s.begun == 0 && s.written == 0)
        })
    }

    fn wait_for_transfer(&self) {
        while !self.is_ready() {
            core::hint::spin_loop();
        }
    }

    fn with_lane(&self, lane: LaneId, f: impl FnOnce(&mut MuxState)) -> Result<(), LaneError> {
        self.inner.lock(|cell| {
            let mut guard = cell.borrow_mut();
            let shared = guard
                .state
                .as_mut()
                .filter(|s| s.registered & lane.mask() != 0)
                .ok_or(LaneError::NotRegistered)?;
            f(shared);
            Ok(())
        })
    }
}

/// Muxes keyed by peripheral
pub struct LaneMuxSet<'a, P: MuxPeripheral, K: MicrosClock, const N: usize> {
    muxes: BoundedVec<LaneMux<'a, P, K>, N>,
}

impl<'a, P: MuxPeripheral, K: MicrosClock, const N: usize> LaneMuxSet<'a, P, K, N> {
    pub const fn new() -> Self {
        Self {
            muxes: BoundedVec::new(),
        }
    }

    /// Add a mux; its peripheral must not already be present
    pub fn insert(&mut self, mux: LaneMux<'a, P, K>) -> Result<(), LaneError> {
        if self.get(mux.id()).is_some() {
            return Err(LaneError::DuplicatePeripheral);
        }
        self.muxes.push(mux).map_err(|_| LaneError::SetFull)
    }

    /// Mux driving peripheral `id`
    pub fn get(&self, id: PeripheralId) -> Option<&LaneMux<'a, P, K>> {
        self.muxes.iter().find(|m| m.id() == id)
    }

    pub fn len(&self) -> usize {
        self.muxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.muxes.is_empty()
    }
}

impl<P: MuxPeripheral, K: MicrosClock, const N: usize> Default for LaneMuxSet<'_, P, K, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// One lane of a [`LaneMux`], usable as a protocol's transport
///
/// The lane registers on `begin` and unregisters on drop.
pub struct MuxLane<'m, 'a, P: MuxPeripheral, K: MicrosClock> {
    mux: &'m LaneMux<'a, P, K>,
    frame_bytes: usize,
    lane: Option<LaneId>,
}

impl<'m, 'a, P: MuxPeripheral, K: MicrosClock> MuxLane<'m, 'a, P, K> {
    /// Lane sending `frame_bytes` of protocol data per frame
    pub fn new(mux: &'m LaneMux<'a, P, K>, frame_bytes: usize) -> Self {
        Self {
            mux,
            frame_bytes,
            lane: None,
        }
    }

    /// Assigned lane, once registered
    pub fn lane(&self) -> Option<LaneId> {
        self.lane
    }
}

impl<P: MuxPeripheral, K: MicrosClock> Transport for MuxLane<'_, '_, P, K> {
    fn begin(&mut self) {
        if self.lane.is_some() {
            return;
        }
        match self.mux.register(self.frame_bytes) {
            Ok(lane) => self.lane = Some(lane),
            Err(_) => warn!("lane registration on peripheral {} failed", self.mux.id().0),
        }
    }

    fn begin_transaction(&mut self) {
        if let Some(lane) = self.lane {
            let _ = self.mux.begin(lane);
        }
    }

    fn transmit_bytes(&mut self, data: &[u8]) {
        match self.lane {
            Some(lane) => {
                let _ = self.mux.write(lane, data);
            }
            None => trace!("unregistered lane dropped {} bytes", data.len()),
        }
    }

    fn end_transaction(&mut self) {
        if let Some(lane) = self.lane {
            let _ = self.mux.end(lane);
        }
    }

    fn is_ready_to_update(&self) -> bool {
        self.mux.is_ready()
    }
}

impl<P: MuxPeripheral, K: MicrosClock> Drop for MuxLane<'_, '_, P, K> {
    fn drop(&mut self) {
        if let Some(lane) = self.lane.take() {
            self.mux.unregister(lane);
        }
    }
}
