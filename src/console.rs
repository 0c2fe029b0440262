// Line-oriented debug console.
//
// Parses one command per line and runs it against a scheduler,
// writing the reply into any fmt::Write. Bad input gets the usage
// text back; nothing here panics on user input.

use core::fmt::{self, Write};
use core::str::FromStr;

use megasched_kernel::{EventId, GroupId, Scheduler};

pub const USAGE: &str = "Commands: dump | stats | events | suspend <group> | resume <group> | \
set <event> | clear <event> | restart <task-id> | kill <task-id> | help";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Dump,
    Stats,
    Events,
    Suspend(GroupId),
    Resume(GroupId),
    Set(EventId),
    Clear(EventId),
    Restart(u8),
    Kill(u8),
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    Unknown,
    MissingArg(&'static str),
    BadArg(&'static str),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty command"),
            ParseError::Unknown => write!(f, "unknown command"),
            ParseError::MissingArg(what) => write!(f, "missing <{}>", what),
            ParseError::BadArg(what) => write!(f, "<{}> must be 0-255", what),
        }
    }
}

impl std::error::Error for ParseError {}

fn arg(word: Option<&str>, what: &'static str) -> Result<u8, ParseError> {
    word.ok_or(ParseError::MissingArg(what))?
        .parse()
        .map_err(|_| ParseError::BadArg(what))
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(ParseError::Empty);
        };
        let next = words.next();

        let cmd = match verb.to_ascii_lowercase().as_str() {
            "dump" => Command::Dump,
            "stats" => Command::Stats,
            "events" => Command::Events,
            "help" | "?" => Command::Help,
            "suspend" => Command::Suspend(arg(next, "group")?),
            "resume" => Command::Resume(arg(next, "group")?),
            "set" => Command::Set(arg(next, "event")?),
            "clear" => Command::Clear(arg(next, "event")?),
            "restart" => Command::Restart(arg(next, "task-id")?),
            "kill" => Command::Kill(arg(next, "task-id")?),
            _ => return Err(ParseError::Unknown),
        };
        Ok(cmd)
    }
}

pub fn execute<U, const N: usize>(
    cmd: Command,
    sched: &mut Scheduler<U, N>,
    out: &mut impl Write,
) -> fmt::Result {
    match cmd {
        Command::Dump => dump(sched, out),
        Command::Stats => {
            let s = sched.stats();
            writeln!(
                out,
                "[Stats] ticks {} | runs {} | completed {} | removed {} | wdt resets {} | tasks {}/{}",
                s.ticks,
                s.invocations,
                s.completions,
                s.removals,
                s.watchdog_resets,
                sched.len(),
                sched.capacity()
            )
        }
        Command::Events => {
            write!(out, "[Events] set:")?;
            for id in sched.signals().events().iter_set() {
                write!(out, " {}", id)?;
            }
            writeln!(out)
        }
        Command::Suspend(g) | Command::Resume(g) if g >= sched.signals().groups().len() => {
            let n = sched.signals().groups().len();
            writeln!(out, "group {} ignored (groups 0-{})", g, last(n))
        }
        Command::Set(e) | Command::Clear(e) if e >= sched.signals().events().len() => {
            let n = sched.signals().events().len();
            writeln!(out, "event {} ignored (events 0-{})", e, last(n))
        }
        Command::Suspend(g) => {
            sched.group_suspend(g);
            writeln!(out, "group {} suspended", g)
        }
        Command::Resume(g) => {
            sched.group_resume(g);
            writeln!(out, "group {} resumed", g)
        }
        Command::Set(e) => {
            sched.event_set(e);
            writeln!(out, "event {} set", e)
        }
        Command::Clear(e) => {
            sched.event_clear(e);
            writeln!(out, "event {} cleared", e)
        }
        Command::Restart(id) => match sched.find(id).map(|h| sched.restart(h)) {
            Some(Ok(())) => writeln!(out, "task {} restarted", id),
            Some(Err(e)) => writeln!(out, "task {}: {}", id, e),
            None => writeln!(out, "no task {}", id),
        },
        Command::Kill(id) => match sched.find(id).map(|h| sched.remove(h)) {
            Some(Ok(())) => writeln!(out, "task {} removed", id),
            Some(Err(e)) => writeln!(out, "task {}: {}", id, e),
            None => writeln!(out, "no task {}", id),
        },
        Command::Help => writeln!(out, "{}", USAGE),
    }
}

// highest valid id for a registry of `len` flags
fn last(len: u8) -> u8 {
    len.saturating_sub(1)
}

pub fn dump<U, const N: usize>(sched: &Scheduler<U, N>, out: &mut impl Write) -> fmt::Result {
    writeln!(out, "[Snapshot] Task States @ {} ms", sched.now())?;
    for task in sched.snapshot() {
        writeln!(out, "{}", task)?;
    }
    write!(out, "[Snapshot] suspended groups:")?;
    for g in sched.signals().groups().iter_set() {
        write!(out, " {}", g)?;
    }
    writeln!(out)
}

/// Parse and run one line. Parse failures are answered with the usage text.
pub fn handle_line<U, const N: usize>(
    line: &str,
    sched: &mut Scheduler<U, N>,
    out: &mut impl Write,
) -> fmt::Result {
    match line.parse::<Command>() {
        Ok(cmd) => execute(cmd, sched, out),
        Err(ParseError::Empty) => Ok(()),
        Err(e) => {
            writeln!(out, "{}", e)?;
            writeln!(out, "{}", USAGE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use megasched_kernel::{Context, SchedulerConfig};

    fn idle(_: &mut Context<'_, ()>) {}

    fn sched() -> Scheduler<(), 4> {
        Scheduler::new(SchedulerConfig::new(), 0)
    }

    fn run(line: &str, s: &mut Scheduler<(), 4>) -> String {
        let mut out = String::new();
        handle_line(line, s, &mut out).unwrap();
        out
    }

    #[test]
    fn parses_commands_and_arguments() {
        assert_eq!("dump".parse::<Command>(), Ok(Command::Dump));
        assert_eq!("  SUSPEND 2 ".parse::<Command>(), Ok(Command::Suspend(2)));
        assert_eq!("kill 7".parse::<Command>(), Ok(Command::Kill(7)));
        assert_eq!("resume".parse::<Command>(), Err(ParseError::MissingArg("group")));
        assert_eq!("set 300".parse::<Command>(), Err(ParseError::BadArg("event")));
        assert_eq!("reboot".parse::<Command>(), Err(ParseError::Unknown));
        assert_eq!("".parse::<Command>(), Err(ParseError::Empty));
    }

    #[test]
    fn group_and_event_commands_reach_the_registry() {
        let mut s = sched();
        run("suspend 1", &mut s);
        run("set 3", &mut s);
        assert!(s.group_suspended(1));
        assert!(s.event_check(3));
        assert_eq!(run("events", &mut s), "[Events] set: 3\n");

        run("resume 1", &mut s);
        run("clear 3", &mut s);
        assert!(!s.group_suspended(1));
        assert!(!s.event_check(3));

        // out of range for the registry: reported, no effect
        assert_eq!(run("suspend 200", &mut s), "group 200 ignored (groups 0-3)\n");
        assert_eq!(run("set 8", &mut s), "event 8 ignored (events 0-7)\n");
        assert_eq!(s.signals().groups().bits(), 0);
        assert_eq!(s.signals().events().bits(), 0);
    }

    #[test]
    fn task_commands_address_by_id() {
        let mut s = sched();
        s.register(idle, 4, 1, 0, ()).unwrap();
        assert_eq!(run("restart 4", &mut s), "task 4 restarted\n");
        assert_eq!(run("kill 4", &mut s), "task 4 removed\n");
        assert_eq!(run("kill 4", &mut s), "no task 4\n");
        assert!(s.is_empty());
    }

    #[test]
    fn dump_lists_tasks_and_suspended_groups() {
        let mut s = sched();
        s.register(idle, 4, 1, 2, ()).unwrap();
        s.group_suspend(2);
        let out = run("dump", &mut s);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "[Snapshot] Task States @ 0 ms");
        assert!(lines[1].starts_with(" - Task 4 | Prio 1 | Group 2* | Susp 0"));
        assert_eq!(lines[2], "[Snapshot] suspended groups: 2");
    }

    #[test]
    fn bad_input_replies_with_usage() {
        let mut s = sched();
        let out = run("frobnicate", &mut s);
        assert!(out.starts_with("unknown command\n"));
        assert!(out.contains(USAGE));
        assert_eq!(run("   ", &mut s), "");
    }
}
