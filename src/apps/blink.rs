// LED toggle every 500ms, forever.

use log::info;
use megasched_kernel::{Context, Resume};

use super::Scratch;

const PERIOD_MS: u32 = 500;

const OFF: Resume = Resume::at(1);
const ON: Resume = Resume::at(2);

pub fn blink(cx: &mut Context<'_, Scratch>) {
    match cx.marker() {
        Resume::START => {
            info!("[Blink {}] LED ON", cx.id());
            cx.delay(OFF, PERIOD_MS);
        }
        OFF => {
            if !cx.delay_done() {
                return;
            }
            info!("[Blink {}] LED OFF", cx.id());
            cx.delay(ON, PERIOD_MS);
        }
        ON => {
            if !cx.delay_done() {
                return;
            }
            info!("[Blink {}] LED ON", cx.id());
            cx.delay(OFF, PERIOD_MS);
        }
        _ => cx.finish(),
    }
}
