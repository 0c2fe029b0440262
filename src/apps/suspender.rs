// Suspends group Scratch::group after 3s, resumes it 2s later, finishes.

use log::info;
use megasched_kernel::{Context, Resume};

use super::Scratch;

const SUSPEND_AFTER_MS: u32 = 3000;
const HOLD_MS: u32 = 2000;

const SUSPEND: Resume = Resume::at(1);
const RESUME: Resume = Resume::at(2);

pub fn suspender(cx: &mut Context<'_, Scratch>) {
    let group = cx.user().group;
    match cx.marker() {
        Resume::START => {
            info!(
                "[Suspender {}] suspending group {} in {}ms",
                cx.id(),
                group,
                SUSPEND_AFTER_MS
            );
            cx.delay(SUSPEND, SUSPEND_AFTER_MS);
        }
        SUSPEND => {
            if !cx.delay_done() {
                return;
            }
            cx.group_suspend(group);
            info!("[Suspender {}] group {} suspended", cx.id(), group);
            cx.delay(RESUME, HOLD_MS);
        }
        RESUME => {
            if !cx.delay_done() {
                return;
            }
            cx.group_resume(group);
            info!("[Suspender {}] group {} resumed", cx.id(), group);
            cx.finish();
        }
        _ => cx.finish(),
    }
}
