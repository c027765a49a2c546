//! Watchdog Example
//!
//! A supervisor links a flaky worker and traps its exits: instead of being
//! killed alongside the worker, it receives the exit signal as an ordinary
//! message, respawns a replacement, and keeps routing jobs.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use hypha::{ActorContext, ActorRef, ActorRuntime, Exit, Receive, Step};

struct Job {
    payload: u32,
}

fn spawn_worker(runtime: &ActorRuntime, supervisor: &mut ActorContext) -> ActorRef {
    let worker = runtime.spawn(|ctx| {
        ctx.loop_with(|ctx| {
            ctx.react(Receive::new().on::<Job, _>(|ctx, job| {
                if job.payload % 3 == 0 {
                    return ctx.exit(format!("cannot handle {}", job.payload));
                }
                println!("[worker] handled job {}", job.payload);
                Step::Done
            }))
        })
    });
    supervisor.link(&worker);
    worker
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Watchdog Example ===\n");

    let runtime = ActorRuntime::new();

    let runtime_for_watchdog = runtime.clone();
    let watchdog = runtime.spawn(move |ctx| {
        ctx.trap_exit(true);
        let mut worker = spawn_worker(&runtime_for_watchdog, ctx);

        ctx.event_loop(move |ctx, msg| {
            if let Some(exit) = msg.downcast_ref::<Exit>() {
                println!("[watchdog] worker died ({}); respawning", exit.reason);
                worker = spawn_worker(&runtime_for_watchdog, ctx);
            } else if msg.is::<Job>() {
                ctx.forward(&worker, msg);
            }
        })
    });

    // Job 3 and 6 kill the worker; the watchdog replaces it each time.
    for payload in 1..=7 {
        watchdog.send(Job { payload });
        thread::sleep(Duration::from_millis(100));
    }

    println!("\nDone; shutting down.");
    runtime.shutdown();
    Ok(())
}
