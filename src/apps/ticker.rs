// Periodic log line once a second via the rate limiter.
// Still dispatched every tick; the limiter short-circuits in between.

use log::info;
use megasched_kernel::Context;

use super::Scratch;

const INTERVAL_MS: u32 = 1000;

pub fn ticker(cx: &mut Context<'_, Scratch>) {
    if !cx.every(INTERVAL_MS) {
        return;
    }
    cx.user_mut().count += 1;
    info!("[Logger {}] tick at {} ms", cx.id(), cx.now());
}
