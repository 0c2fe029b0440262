// megasched demo entry point and main loop
//
// Boot sequence: logger -> scheduler -> register demo tasks
// Main loop: run_once against the host clock -> optional console
// prompt -> sleep one tick -> repeat until the run length is up.
//
// The console blocks the loop while it waits for a line; tasks see
// that as a long tick gap, which is how a stalled board looks too.
// EOF on stdin turns the console off for the rest of the run.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use env_logger::Env;
use log::{debug, error, info, warn};

use megasched::apps::{self, DemoScheduler};
use megasched::clock::StdClock;
use megasched::console;
use megasched_kernel::time::elapsed;
use megasched_kernel::{Clock, Notice, SchedulerConfig};

const TICK_MS: u64 = 50;
const CONSOLE_INTERVAL_MS: u32 = 5_000;
const DEFAULT_RUN_SECS: u32 = 20;

const USAGE: &str = "usage: megasched [--seconds N] [--console]";

struct Options {
    seconds: u32,
    console: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut opts = Options {
        seconds: DEFAULT_RUN_SECS,
        console: false,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seconds" | "-s" => {
                let value = args.next().ok_or("--seconds needs a value")?;
                opts.seconds = value
                    .parse()
                    .map_err(|_| format!("bad --seconds value: {}", value))?;
            }
            "--console" | "-c" => opts.console = true,
            "--help" | "-h" => return Err(USAGE.into()),
            other => return Err(format!("unknown argument: {}", other)),
        }
    }
    Ok(opts)
}

fn log_notice(notice: &Notice) {
    debug!("[observer] {}", notice);
}

/// One prompt round. Returns false once stdin is closed.
fn prompt(sched: &mut DemoScheduler) -> bool {
    print!("megasched> ");
    let _ = io::stdout().flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) => {
            info!("console: stdin closed, console off");
            false
        }
        Ok(_) => {
            let mut reply = String::new();
            if console::handle_line(&line, sched, &mut reply).is_err() {
                warn!("console: reply formatting failed");
            }
            print!("{}", reply);
            true
        }
        Err(e) => {
            warn!("console: read failed: {}", e);
            false
        }
    }
}

fn main() -> ExitCode {
    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::from(2);
        }
    };

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let clock = StdClock::new();
    let mut sched = DemoScheduler::new(SchedulerConfig::new(), clock.now_ms());
    sched.set_observer(log_notice);

    if let Err(e) = apps::register_demo(&mut sched) {
        error!("demo registration failed: {}", e);
        return ExitCode::FAILURE;
    }
    info!(
        "megasched: {} tasks, {}ms tick, running {}s",
        sched.len(),
        TICK_MS,
        opts.seconds
    );

    let run_ms = opts.seconds.saturating_mul(1000);
    let start = clock.now_ms();
    let mut console_on = opts.console;
    let mut last_prompt = start;
    let mut idle_ticks: u32 = 0;

    loop {
        if sched.run_once(&clock).is_idle() {
            idle_ticks = idle_ticks.wrapping_add(1);
        }

        let now = clock.now_ms();
        if elapsed(now, start) >= run_ms {
            break;
        }
        if console_on && elapsed(now, last_prompt) >= CONSOLE_INTERVAL_MS {
            console_on = prompt(&mut sched);
            last_prompt = clock.now_ms();
        }

        thread::sleep(Duration::from_millis(TICK_MS));
    }

    let mut report = String::new();
    let shown = console::execute(console::Command::Dump, &mut sched, &mut report)
        .and_then(|_| console::execute(console::Command::Stats, &mut sched, &mut report));
    if shown.is_err() {
        warn!("final report formatting failed");
    }
    print!("{}", report);
    info!(
        "megasched: {} of {} ticks idle",
        idle_ticks,
        sched.stats().ticks
    );

    ExitCode::SUCCESS
}
