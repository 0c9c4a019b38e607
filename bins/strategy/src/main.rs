//! Strategy process: consumes the gateway feed and the shared book, emits
//! orders to the order manager when its signal rules fire.

mod signals;

use anyhow::Context;
use basalt_config::SystemConfig;
use basalt_store::BookReader;
use basalt_util::ShutdownFlag;
use basalt_wire::{Body, FramedConn, Message, WireError};
use signals::SignalEngine;
use std::time::{Duration, Instant};
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    let cfg = SystemConfig::load_or_default(std::env::args().nth(1))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cfg.log_level))
        .init();

    let shutdown = ShutdownFlag::install();

    let mut gateway = FramedConn::connect_with_retry(
        cfg.gateway_addr.as_str(),
        cfg.connect_attempts,
        cfg.connect_retry_delay(),
    )
    .context("subscribe to gateway")?;
    gateway
        .set_recv_timeout(Some(cfg.recv_timeout()))
        .context("set receive deadline")?;

    let mut ordermanager = FramedConn::connect_with_retry(
        cfg.ordermanager_addr.as_str(),
        cfg.connect_attempts,
        cfg.connect_retry_delay(),
    )
    .context("connect to order manager")?;

    // The book region appears once bookd creates it; run without it rather
    // than refusing to start, the signal rules only lose the mid-price.
    let book = wait_for_book(&cfg, shutdown);
    if book.is_none() {
        warn!(region = %cfg.book_region, "book region unavailable, pricing off the feed");
    }

    let mut engine = SignalEngine::new(cfg.price_change_threshold, cfg.sentiment_threshold);
    let mut orders = 0u64;
    let mut last_stats = Instant::now();

    info!(gateway = %gateway.peer_addr(), ordermanager = %ordermanager.peer_addr(), "strategy running");

    while !shutdown.is_set() {
        match gateway.recv() {
            Ok(Some(msg)) => match msg.body {
                Body::MarketData(md) => {
                    if let Some(order) = engine.on_market_data(&md, book.as_ref()) {
                        info!(
                            order_id = %order.order_id,
                            side = ?order.side,
                            symbol = %order.symbol,
                            price = order.price,
                            "signal fired"
                        );
                        ordermanager
                            .send(&Message::new(Body::Order(order)))
                            .context("send order")?;
                        orders += 1;
                    }
                }
                Body::Sentiment(s) => engine.on_sentiment(&s),
                Body::Shutdown => {
                    info!("gateway requested shutdown");
                    shutdown.request();
                }
                _ => {}
            },
            Err(WireError::Timeout) => {}
            Ok(None) => {
                warn!("gateway closed the stream");
                break;
            }
            Err(e) => {
                warn!(error = %e, "receive failed");
                break;
            }
        }

        if last_stats.elapsed() >= cfg.stats_interval() {
            info!(signals = engine.signals, orders, "strategy statistics");
            last_stats = Instant::now();
        }
    }

    info!(signals = engine.signals, orders, "strategy stopped");
    Ok(())
}

/// Poll for the region until it exists or the wait budget is spent.
fn wait_for_book(cfg: &SystemConfig, shutdown: ShutdownFlag) -> Option<BookReader> {
    let deadline = Instant::now()
        + cfg.connect_retry_delay() * cfg.connect_attempts.max(1);
    loop {
        match BookReader::open(&cfg.book_region) {
            Ok(reader) => {
                info!(region = %cfg.book_region, "attached to book region");
                return Some(reader);
            }
            Err(_) if Instant::now() < deadline && !shutdown.is_set() => {
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                warn!(error = %e, "book region attach failed");
                return None;
            }
        }
    }
}
