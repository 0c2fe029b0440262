// Counts up to Scratch::limit, one step every 300ms, then finishes.
// The count lives in the user context and survives restarts.

use log::info;
use megasched_kernel::{Context, Resume};

use super::Scratch;

const STEP_MS: u32 = 300;

const NEXT: Resume = Resume::at(1);

pub fn counter(cx: &mut Context<'_, Scratch>) {
    if cx.marker() == NEXT && !cx.delay_done() {
        return;
    }

    let Scratch { count, limit, .. } = *cx.user();
    if count >= limit {
        info!("[Count {}] done counting", cx.id());
        cx.finish();
        return;
    }

    info!("[Count {}] {}", cx.id(), count);
    cx.user_mut().count += 1;
    cx.delay(NEXT, STEP_MS);
}
