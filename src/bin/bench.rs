//! Thin load-generator / latency-harness driver built purely on the public
//! `Client` API (out-of-scope per spec.md §1; kept small on purpose).

use clap::Parser;
use limitbook::config::{BenchArgs, SOCKET_BUFFER_SIZE, SOCKET_FLUSH_THRESHOLD};
use limitbook::engine::MatchEvent;
use limitbook::order::Side;
use limitbook::prelude::{Client, ClientEventHandler};
use limitbook::stats;
use rand::Rng;

#[derive(Default)]
struct NullHandler;

impl ClientEventHandler for NullHandler {
    fn on_place(&mut self, _success: bool, _id: u64) {}
    fn on_cancel(&mut self, _success: bool, _id: u64) {}
    fn on_match(&mut self, _event: MatchEvent) {}
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new("info")).init();
    let args = BenchArgs::parse();

    let mut client: Client<SOCKET_BUFFER_SIZE, NullHandler> = match Client::connect(
        &args.host,
        &args.port.to_string(),
        SOCKET_FLUSH_THRESHOLD,
        NullHandler,
    ) {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "failed to connect to server");
            std::process::exit(2);
        }
    };

    let mut rng = rand::thread_rng();
    let mut latencies = Vec::with_capacity(args.orders as usize);
    for id in 0..args.orders {
        let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let price = rng.gen_range(100..150);
        let quantity = rng.gen_range(1..10);
        let start = std::time::Instant::now();
        if let Err(err) = client.place(side, id, price, quantity) {
            tracing::error!(error = %err, "place failed, stopping run early");
            break;
        }
        client.flush().ok();
        if let Err(err) = client.receive_response() {
            tracing::error!(error = %err, "receive failed, stopping run early");
            break;
        }
        latencies.push(start.elapsed().as_nanos() as u64);
    }

    match stats::percentiles(&mut latencies) {
        Some(p) => println!("orders={} latency(ns): {}", latencies.len(), p),
        None => println!("no orders completed"),
    }

    client.close();
}
