// First attempt sleeps past the watchdog timeout and gets reset; the
// retry (attempt count kept in the user context) succeeds.

use log::info;
use megasched_kernel::{Context, Resume};

use super::Scratch;

// longer than the default 3s watchdog
const HANG_MS: u32 = 5000;

const HUNG: Resume = Resume::at(1);

pub fn flaky(cx: &mut Context<'_, Scratch>) {
    match cx.marker() {
        Resume::START => {
            info!("[Flaky {}] running...", cx.id());
            let attempt = cx.user().count;
            cx.user_mut().count += 1;
            if attempt == 0 {
                cx.delay(HUNG, HANG_MS);
            } else {
                info!("[Flaky {}] success on retry", cx.id());
                cx.finish();
            }
        }
        HUNG => {
            if !cx.delay_done() {
                return;
            }
            cx.finish();
        }
        _ => cx.finish(),
    }
}
