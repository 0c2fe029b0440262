// Demo tasks and the table they are registered into.
//
// Every demo shares one user-context type, Scratch; each task reads
// only the fields it needs.

pub mod alarm;
pub mod blink;
pub mod counter;
pub mod flaky;
pub mod suspender;
pub mod ticker;

use megasched_kernel::{EventId, GroupId, SchedError, Scheduler, TaskFn};

pub use alarm::{alarm_trigger, alarm_wait};
pub use blink::blink;
pub use counter::counter;
pub use flaky::flaky;
pub use suspender::suspender;
pub use ticker::ticker;

pub const DEMO_TASKS: usize = 8;

pub type DemoScheduler = Scheduler<Scratch, DEMO_TASKS>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scratch {
    pub count: u32,
    pub limit: u32,
    pub event: EventId,
    pub group: GroupId,
}

impl Scratch {
    pub const fn new() -> Self {
        Self {
            count: 0,
            limit: 0,
            event: 0,
            group: 0,
        }
    }

    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub const fn event(mut self, event: EventId) -> Self {
        self.event = event;
        self
    }

    pub const fn group(mut self, group: GroupId) -> Self {
        self.group = group;
        self
    }
}

pub const ALARM_EVENT: EventId = 2;
pub const PAUSABLE_GROUP: GroupId = 1;

struct DemoTask {
    body: TaskFn<Scratch>,
    id: u8,
    priority: u8,
    group: GroupId,
    scratch: Scratch,
}

const DEMO: [DemoTask; 7] = [
    DemoTask {
        body: blink,
        id: 0,
        priority: 1,
        group: 0,
        scratch: Scratch::new(),
    },
    DemoTask {
        body: counter,
        id: 1,
        priority: 2,
        group: 0,
        scratch: Scratch::new().limit(10),
    },
    DemoTask {
        body: ticker,
        id: 2,
        priority: 3,
        group: PAUSABLE_GROUP,
        scratch: Scratch::new(),
    },
    DemoTask {
        body: alarm_wait,
        id: 3,
        priority: 2,
        group: PAUSABLE_GROUP,
        scratch: Scratch::new().event(ALARM_EVENT),
    },
    DemoTask {
        body: alarm_trigger,
        id: 4,
        priority: 2,
        group: PAUSABLE_GROUP,
        scratch: Scratch::new().event(ALARM_EVENT),
    },
    DemoTask {
        body: suspender,
        id: 5,
        priority: 4,
        group: 0,
        scratch: Scratch::new().group(PAUSABLE_GROUP),
    },
    DemoTask {
        body: flaky,
        id: 6,
        priority: 3,
        group: 0,
        scratch: Scratch::new(),
    },
];

pub fn register_demo(sched: &mut DemoScheduler) -> Result<(), SchedError> {
    for t in &DEMO {
        sched.register(t.body, t.id, t.priority, t.group, t.scratch)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use megasched_kernel::SchedulerConfig;

    const TICK_MS: u32 = 50;

    fn run(sched: &mut DemoScheduler, from_ms: u32, until_ms: u32) {
        let mut now = from_ms;
        while now <= until_ms {
            sched.tick(now);
            now += TICK_MS;
        }
    }

    #[test]
    fn demo_set_fits_and_runs_its_course() {
        let mut s = DemoScheduler::new(SchedulerConfig::new(), 0);
        register_demo(&mut s).unwrap();
        assert_eq!(s.len(), DEMO.len());

        let counter = s.find(1).unwrap();
        let ticker = s.find(2).unwrap();
        let flaky = s.find(6).unwrap();

        run(&mut s, 0, 12_000);

        // counter, both alarm tasks, suspender and flaky have finished
        assert!(s.tcb(counter).is_none());
        assert!(s.find(3).is_none());
        assert!(s.find(4).is_none());
        assert!(s.find(5).is_none());
        assert!(s.tcb(flaky).is_none());
        assert_eq!(s.len(), 2);

        // flaky needed exactly one watchdog reset
        assert_eq!(s.stats().watchdog_resets, 1);
        assert!(!s.group_suspended(PAUSABLE_GROUP));
        assert!(s.event_check(ALARM_EVENT));

        // ticker was paused 3s..5s, so it fired 11 times (0..=12s minus 3s and 4s)
        assert_eq!(s.tcb(ticker).unwrap().user().count, 11);
    }

    #[test]
    fn flaky_recovers_through_watchdog() {
        let mut s = DemoScheduler::new(SchedulerConfig::new(), 0);
        let h = s.register(flaky, 6, 0, 0, Scratch::new()).unwrap();

        run(&mut s, 0, 3000);
        assert_eq!(s.tcb(h).unwrap().user().count, 1);
        assert_eq!(s.tcb(h).unwrap().recoveries(), 0);

        // deadline 3000 passes at the 3050 tick; the retry runs next tick
        run(&mut s, 3050, 3050);
        assert_eq!(s.tcb(h).unwrap().recoveries(), 1);
        run(&mut s, 3100, 3100);
        assert!(s.tcb(h).is_none());
    }
}
