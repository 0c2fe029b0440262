// Millisecond clock sources and wraparound-safe comparisons
//
// All scheduler timestamps are u32 milliseconds that wrap at 2^32
// (~49.7 days). Never compare two timestamps with < or >; take the
// wrapping difference and read it as signed. That stays correct as
// long as the two points are less than 2^31 ms apart.
//
// TickClock is fed from a periodic timer interrupt. TICK_WEIGHT-style
// scaling lets the timer slow down while idle without the uptime
// drifting.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

/// A monotonic millisecond counter.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Milliseconds since `since`, across a wrap.
#[inline]
pub const fn elapsed(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// `now >= deadline`, wrap safe.
#[inline]
pub const fn reached(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

/// `now > deadline`, wrap safe.
#[inline]
pub const fn expired(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) > 0
}

/// Uptime counter advanced by a timer ISR.
///
/// ```ignore
/// static CLOCK: TickClock = TickClock::new(10);
///
/// fn timer_isr() {
///     CLOCK.advance();
/// }
/// ```
pub struct TickClock {
    // ms per base tick
    base_ms: u32,
    // base ticks per interrupt (1 when active, more when the timer is slowed)
    weight: AtomicU32,
    // cs: riscv32imc has no atomic add
    uptime: critical_section::Mutex<Cell<u32>>,
}

impl TickClock {
    pub const fn new(base_ms: u32) -> Self {
        Self {
            base_ms,
            weight: AtomicU32::new(1),
            uptime: critical_section::Mutex::new(Cell::new(0)),
        }
    }

    /// Call once per timer interrupt.
    #[inline]
    pub fn advance(&self) {
        let step = self
            .base_ms
            .wrapping_mul(self.weight.load(Ordering::Relaxed));
        critical_section::with(|cs| {
            let uptime = self.uptime.borrow(cs);
            uptime.set(uptime.get().wrapping_add(step));
        });
    }

    pub fn set_tick_weight(&self, weight: u32) {
        self.weight.store(weight.max(1), Ordering::Release);
    }

    pub fn tick_weight(&self) -> u32 {
        self.weight.load(Ordering::Acquire)
    }

    pub fn uptime_ms(&self) -> u32 {
        critical_section::with(|cs| self.uptime.borrow(cs).get())
    }

    pub fn uptime_secs(&self) -> u32 {
        self.uptime_ms() / 1000
    }
}

impl Clock for TickClock {
    #[inline]
    fn now_ms(&self) -> u32 {
        self.uptime_ms()
    }
}
