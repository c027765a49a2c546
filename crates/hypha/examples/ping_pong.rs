//! Ping-Pong Example
//!
//! Two actors exchange ping/pong messages: the ponger is event-based (it
//! holds no thread between messages), the pinger blocks a worker while it
//! waits for each reply.

use anyhow::Result;
use hypha::{ActorRuntime, Receive, Step};

#[derive(Debug)]
struct Ping {
    round: u32,
}

#[derive(Debug)]
struct Pong {
    round: u32,
}

struct Halt;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Ping-Pong Example ===\n");

    let runtime = ActorRuntime::new();

    // Event-based: reacts to each ping, replies, releases its worker.
    let ponger = runtime.spawn(|ctx| {
        ctx.loop_with(|ctx| {
            ctx.react(
                Receive::new()
                    .on::<Ping, _>(|ctx, ping| {
                        println!("[ponger] ping #{}", ping.round);
                        ctx.reply(Pong { round: ping.round });
                        Step::Done
                    })
                    .on::<Halt, _>(|ctx, _| {
                        println!("[ponger] halting");
                        ctx.stop()
                    }),
            )
        })
    });

    // Thread-based: blocks its worker while waiting for each pong.
    let ponger_ref = ponger.clone();
    runtime.spawn(move |ctx| {
        for round in 1..=10 {
            ponger_ref.send(Ping { round });
            let got = ctx.recv(Receive::new().on::<Pong, _>(|_, pong: Pong| pong.round));
            println!("[pinger] pong #{}", got);
        }
        ponger_ref.send(Halt);
        Step::Done
    });

    runtime.join();
    println!("\nBoth actors terminated; mailboxes drained.");
    runtime.shutdown();

    Ok(())
}
