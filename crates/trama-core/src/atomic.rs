//! Lock-free value handoff and short spin locks.
//!
//! - [`AtomicValue`]: double-buffered value with a four-state write handshake.
//!   Readers never block; a writer gets one compare-and-swap per [`set`](AtomicValue::set).
//! - [`SpinLock`] / [`AtomicLock`]: a single atomic flag, busy-spinning
//!   [`SPIN_ATTEMPTS`] times before yielding the time slice.
//!
//! The render thread must treat a failed `set` as "try again next block". The
//! control thread uses [`exchange`](AtomicValue::exchange), which retries up to an
//! explicit bound and reports [`Contention`] when the bound is exhausted.

use core::hint::spin_loop;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use parking_lot::lock_api;

/// Busy-spin iterations before a waiter yields to the scheduler.
pub const SPIN_ATTEMPTS: u32 = 20;

/// Default retry bound for control-thread writes.
pub const DEFAULT_RETRY_LIMIT: u32 = 1 << 16;

/// A bounded write gave up because the value stayed locked by another writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("atomic value still locked by another writer after {attempts} attempts")]
pub struct Contention {
    /// Attempts made before giving up.
    pub attempts: u32,
}

/// Plain-old-data that round-trips through 64 bits.
pub trait AtomicBits: Copy + Send + Sync + 'static {
    /// Encodes the value.
    fn to_bits(self) -> u64;
    /// Decodes a value produced by [`to_bits`](Self::to_bits).
    fn from_bits(bits: u64) -> Self;
}

macro_rules! int_bits {
    ($($t:ty),*) => {$(
        impl AtomicBits for $t {
            #[inline]
            fn to_bits(self) -> u64 {
                self as u64
            }
            #[inline]
            fn from_bits(bits: u64) -> Self {
                bits as $t
            }
        }
    )*};
}

int_bits!(u8, u16, u32, u64, usize, i32, i64);

impl AtomicBits for bool {
    #[inline]
    fn to_bits(self) -> u64 {
        u64::from(self)
    }
    #[inline]
    fn from_bits(bits: u64) -> Self {
        bits != 0
    }
}

impl AtomicBits for f32 {
    #[inline]
    fn to_bits(self) -> u64 {
        u64::from(f32::to_bits(self))
    }
    #[inline]
    fn from_bits(bits: u64) -> Self {
        f32::from_bits(bits as u32)
    }
}

impl AtomicBits for f64 {
    #[inline]
    fn to_bits(self) -> u64 {
        f64::to_bits(self)
    }
    #[inline]
    fn from_bits(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}

/// Write-side handshake states, cycled in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum Handshake {
    /// Front readable, back free for a writer.
    ReadWrite = 0,
    /// A writer owns the back slot.
    ReadLock = 1,
    /// Back slot holds a fresh value awaiting publication.
    WriteRead = 2,
    /// Writer is replacing the front slot.
    LockRead = 3,
}

/// Double-buffered value shared between one reader side and one active writer.
///
/// `get` is a single atomic load of the readable (front) slot. A writer first
/// claims the back slot with one compare-and-swap (`ReadWrite → ReadLock`),
/// fills it (`WriteRead`), then publishes it to the front (`LockRead`) and
/// releases the handshake (`ReadWrite`). A second writer arriving mid-cycle
/// fails its CAS instead of racing the first.
///
/// # Example
///
/// ```rust
/// use trama_core::AtomicValue;
///
/// let gain = AtomicValue::new(1.0_f32);
/// assert!(gain.set(0.5));
/// assert_eq!(gain.get(), 0.5);
/// assert_eq!(gain.exchange(0.25, 16), Ok(0.5));
/// ```
pub struct AtomicValue<T: AtomicBits> {
    front: AtomicU64,
    back: AtomicU64,
    state: AtomicU8,
    _marker: PhantomData<T>,
}

impl<T: AtomicBits> AtomicValue<T> {
    /// Creates a value with both slots holding `value`.
    pub fn new(value: T) -> Self {
        let bits = value.to_bits();
        Self {
            front: AtomicU64::new(bits),
            back: AtomicU64::new(bits),
            state: AtomicU8::new(Handshake::ReadWrite as u8),
            _marker: PhantomData,
        }
    }

    /// Current published value. Never blocks.
    #[inline]
    pub fn get(&self) -> T {
        T::from_bits(self.front.load(Ordering::Acquire))
    }

    /// Makes one attempt to publish `value`.
    ///
    /// Returns `false` when another writer is mid-cycle. Safe to call from the
    /// render thread.
    #[inline]
    pub fn set(&self, value: T) -> bool {
        self.try_publish(value).is_some()
    }

    /// Publishes `value` and returns the value it replaced, retrying up to
    /// `retry_limit` times.
    ///
    /// Control-thread only: spins [`SPIN_ATTEMPTS`] times between yields.
    pub fn exchange(&self, value: T, retry_limit: u32) -> Result<T, Contention> {
        let mut backoff = Backoff::default();
        for _ in 0..retry_limit.max(1) {
            if let Some(previous) = self.try_publish(value) {
                return Ok(previous);
            }
            backoff.snooze();
        }
        Err(Contention {
            attempts: retry_limit.max(1),
        })
    }

    /// [`exchange`](Self::exchange) without the previous value.
    pub fn set_with_retry(&self, value: T, retry_limit: u32) -> Result<(), Contention> {
        self.exchange(value, retry_limit).map(|_| ())
    }

    /// True while a writer is between claiming and releasing the handshake.
    pub fn is_writing(&self) -> bool {
        let state = self.state.load(Ordering::Acquire);
        state != Handshake::ReadWrite as u8
    }

    fn try_publish(&self, value: T) -> Option<T> {
        self.state
            .compare_exchange(
                Handshake::ReadWrite as u8,
                Handshake::ReadLock as u8,
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .ok()?;

        self.back.store(value.to_bits(), Ordering::Relaxed);
        self.state
            .store(Handshake::WriteRead as u8, Ordering::Release);

        self.state.store(Handshake::LockRead as u8, Ordering::Relaxed);
        let staged = self.back.load(Ordering::Relaxed);
        let previous = self.front.swap(staged, Ordering::AcqRel);

        self.state
            .store(Handshake::ReadWrite as u8, Ordering::Release);
        Some(T::from_bits(previous))
    }
}

impl<T: AtomicBits + Default> Default for AtomicValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: AtomicBits + core::fmt::Debug> core::fmt::Debug for AtomicValue<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("AtomicValue").field(&self.get()).finish()
    }
}

/// Spin-then-yield waiting strategy.
#[derive(Debug, Default)]
pub(crate) struct Backoff {
    spins: u32,
}

impl Backoff {
    #[inline]
    pub(crate) fn snooze(&mut self) {
        if self.spins < SPIN_ATTEMPTS {
            self.spins += 1;
            spin_loop();
        } else {
            self.spins = 0;
            std::thread::yield_now();
        }
    }
}

/// Raw single-flag lock behind [`SpinLock`].
pub struct RawSpinLock {
    locked: AtomicBool,
}

// SAFETY: `locked` is only set by a successful compare_exchange, so at most one
// holder exists; `unlock` is only reachable through the guard of that holder.
#[allow(unsafe_code)]
unsafe impl lock_api::RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self {
        locked: AtomicBool::new(false),
    };

    type GuardMarker = lock_api::GuardSend;

    fn lock(&self) {
        let mut backoff = Backoff::default();
        while !self.try_lock() {
            backoff.snooze();
        }
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// Mutual exclusion for a few instructions' worth of work.
///
/// Never hold it across I/O or allocation.
pub type SpinLock<T> = lock_api::Mutex<RawSpinLock, T>;

/// Guard returned by [`SpinLock::lock`].
pub type SpinLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;

/// A spin lock guarding no data, for bracketing external critical sections.
pub type AtomicLock = SpinLock<()>;
