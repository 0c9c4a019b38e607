//! Gateway process: streams synthetic market data and news sentiment to any
//! number of TCP subscribers, one thread per connection.

mod feed;

use anyhow::Context;
use basalt_config::SystemConfig;
use basalt_util::ShutdownFlag;
use basalt_wire::{Body, FramedConn, Message};
use feed::Feed;
use std::net::{TcpListener, TcpStream};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

fn main() -> anyhow::Result<()> {
    let cfg = SystemConfig::load_or_default(std::env::args().nth(1))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cfg.log_level))
        .init();

    let shutdown = ShutdownFlag::install();
    let listener = TcpListener::bind(&cfg.gateway_addr)
        .with_context(|| format!("bind {}", cfg.gateway_addr))?;
    // Non-blocking accept so the loop keeps observing the shutdown flag.
    listener.set_nonblocking(true)?;
    info!(addr = %cfg.gateway_addr, symbols = cfg.symbols.len(), "gateway accepting subscribers");

    let mut workers = Vec::new();
    while !shutdown.is_set() {
        match listener.accept() {
            Ok((stream, peer)) => {
                info!(%peer, "subscriber connected");
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!(%peer, error = %e, "could not restore blocking mode");
                    continue;
                }
                let cfg = cfg.clone();
                workers.push(std::thread::spawn(move || serve_client(stream, cfg, shutdown)));
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                error!(error = %e, "accept failed");
                break;
            }
        }
    }

    info!("gateway draining subscriber threads");
    for handle in workers {
        let _ = handle.join();
    }
    info!("gateway stopped");
    Ok(())
}

/// Stream one subscriber until it drops or shutdown is requested.
fn serve_client(stream: TcpStream, cfg: SystemConfig, shutdown: ShutdownFlag) {
    let peer = stream
        .peer_addr()
        .map(|p| p.to_string())
        .unwrap_or_else(|_| "<unknown>".into());
    let mut conn = match FramedConn::from_stream(stream) {
        Ok(c) => c,
        Err(e) => {
            warn!(%peer, error = %e, "could not frame subscriber stream");
            return;
        }
    };

    let mut feed = Feed::new();
    let md_interval = Duration::from_millis(cfg.market_data_interval_ms);
    let sentiment_interval = Duration::from_millis(cfg.sentiment_interval_ms);
    let mut next_md = Instant::now();
    let mut next_sentiment = Instant::now() + sentiment_interval;

    while !shutdown.is_set() {
        let now = Instant::now();

        if now >= next_md {
            for symbol in &cfg.symbols {
                let msg = Message::new(Body::MarketData(feed.market_data(symbol)));
                if let Err(e) = conn.send(&msg) {
                    warn!(%peer, error = %e, "subscriber dropped");
                    return;
                }
            }
            next_md = now + md_interval;
        }

        if now >= next_sentiment {
            let msg = Message::new(Body::Sentiment(feed.sentiment(&cfg.symbols)));
            if let Err(e) = conn.send(&msg) {
                warn!(%peer, error = %e, "subscriber dropped");
                return;
            }
            next_sentiment = now + sentiment_interval;
        }

        std::thread::sleep(Duration::from_millis(5));
    }

    // Cooperative shutdown: tell the subscriber before the stream closes so
    // it can wind down instead of treating this as a failure.
    if let Err(e) = conn.send(&Message::shutdown()) {
        warn!(%peer, error = %e, "subscriber missed the shutdown notice");
    }
    info!(%peer, "subscriber closed");
}
