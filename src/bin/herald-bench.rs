//! Бенчмарк «один канал, много подписчиков»: N подписчиков на одном канале,
//! M публикаций, итоговое время и пропускная способность.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use bytes::Bytes;
use clap::Parser;
use herald::{
    create_publisher, create_subscriber, init_logging, init_shared_bus, EventKind, Settings,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "herald-bench",
    version,
    about = "Fan-out benchmark: one channel, many subscribers"
)]
struct Args {
    /// Number of subscribers on the channel.
    #[arg(long, default_value_t = 2000, env = "HERALD_BENCH_SUBSCRIBERS")]
    subscribers: usize,
    /// Number of messages to publish.
    #[arg(long, default_value_t = 1_000_000, env = "HERALD_BENCH_MESSAGES")]
    messages: u64,
    #[arg(long, default_value = "benchmark-pubsub")]
    channel: String,
    #[arg(long, default_value = "This message has 30 characters")]
    payload: String,
    /// Settings file (otherwise `HERALD_CONFIG` or `herald.toml`).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    let logging = init_logging(settings.logging.clone())
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;
    init_shared_bus(settings.bus.clone())?;

    let received = Arc::new(AtomicU64::new(0));
    let mut subscribers = Vec::with_capacity(args.subscribers);
    for _ in 0..args.subscribers {
        let mut subscriber = create_subscriber();
        let received = Arc::clone(&received);
        subscriber.on(EventKind::Message, move |_| {
            received.fetch_add(1, Ordering::Relaxed);
        });
        subscriber.subscribe([args.channel.as_str()])?;
        subscribers.push(subscriber);
    }

    let publisher = create_publisher();
    let payload = Bytes::from(args.payload.clone());
    info!(
        subscribers = args.subscribers,
        messages = args.messages,
        channel = %args.channel,
        "starting fan-out benchmark"
    );

    let started = Instant::now();
    for _ in 0..args.messages {
        publisher
            .publish(&args.channel, payload.clone())
            .context("publish failed")?;
    }
    let elapsed = started.elapsed();
    let delivered = received.load(Ordering::Relaxed);

    println!("Running time: {:.3}s", elapsed.as_secs_f64());
    println!("Messages published: {}", group_thousands(args.messages));
    println!("Messages delivered: {}", group_thousands(delivered));
    println!(
        "Avg published msgs/sec: {}",
        group_thousands(per_second(args.messages, elapsed))
    );
    println!(
        "Avg delivered msgs/sec: {}",
        group_thousands(per_second(delivered, elapsed))
    );

    for subscriber in &mut subscribers {
        subscriber.unsubscribe_all()?;
    }
    logging.shutdown();
    Ok(())
}

fn per_second(count: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (count as f64 / secs).round() as u64
    } else {
        0
    }
}

/// `1234567` -> `1,234,567`.
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
