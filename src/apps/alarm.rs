// Event handshake: the trigger sets Scratch::event after 2s, the
// waiter parks on it and finishes when it shows up.

use log::info;
use megasched_kernel::{Context, Resume};

use super::Scratch;

const TRIGGER_AFTER_MS: u32 = 2000;

const WAIT: Resume = Resume::at(1);
const FIRE: Resume = Resume::at(1);

pub fn alarm_wait(cx: &mut Context<'_, Scratch>) {
    let event = cx.user().event;
    if cx.marker() == Resume::START {
        info!("[Alarm {}] waiting for event {}...", cx.id(), event);
    }

    let ready = cx.event_check(event);
    if !cx.wait_until(WAIT, ready) {
        return;
    }
    info!("[Alarm {}] got event {}!", cx.id(), event);
    cx.user_mut().count += 1;
    cx.finish();
}

pub fn alarm_trigger(cx: &mut Context<'_, Scratch>) {
    let event = cx.user().event;
    match cx.marker() {
        Resume::START => {
            info!(
                "[Trigger {}] will trigger event {} in {}ms",
                cx.id(),
                event,
                TRIGGER_AFTER_MS
            );
            cx.delay(FIRE, TRIGGER_AFTER_MS);
        }
        FIRE => {
            if !cx.delay_done() {
                return;
            }
            cx.event_set(event);
            info!("[Trigger {}] event {} triggered!", cx.id(), event);
            cx.finish();
        }
        _ => cx.finish(),
    }
}
