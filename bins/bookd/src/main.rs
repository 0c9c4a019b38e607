//! Book daemon: the single writer of the shared book region.
//!
//! Subscribes to the gateway feed and publishes every market data update into
//! the region. Owns the region's lifecycle: reclaims whatever a previous run
//! left behind at startup and unlinks exactly once at shutdown.

use anyhow::Context;
use basalt_config::SystemConfig;
use basalt_store::{BookWriter, StoreError, Symbol};
use basalt_util::ShutdownFlag;
use basalt_wire::{Body, FramedConn, MarketData, WireError};
use std::time::Instant;
use tracing::{debug, info, warn};

fn main() -> anyhow::Result<()> {
    let cfg = SystemConfig::load_or_default(std::env::args().nth(1))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cfg.log_level))
        .init();

    let shutdown = ShutdownFlag::install();

    let symbols = cfg
        .symbols
        .iter()
        .map(|s| Symbol::new(s))
        .collect::<Result<Vec<_>, _>>()
        .context("configured symbol set")?;

    // A crashed run leaves the region behind; reclaim it rather than abort.
    // An incompatible live region would also be destroyed here, which is why
    // only this process (the writer role) ever owns the name.
    basalt_store::unlink(&cfg.book_region).context("reclaim stale book region")?;
    let mut writer =
        BookWriter::create(&cfg.book_region, &symbols).context("create book region")?;
    info!(region = %cfg.book_region, slots = symbols.len(), "book region created");

    let result = run(&cfg, &mut writer, shutdown);

    // Teardown owner: destroy the region exactly once. Unlink failure at
    // this point is best-effort cleanup, not a crash.
    drop(writer);
    if let Err(e) = basalt_store::unlink(&cfg.book_region) {
        warn!(error = %e, "book region unlink failed");
    } else {
        info!(region = %cfg.book_region, "book region unlinked");
    }
    result
}

fn run(cfg: &SystemConfig, writer: &mut BookWriter, shutdown: ShutdownFlag) -> anyhow::Result<()> {
    'reconnect: while !shutdown.is_set() {
        let mut conn = FramedConn::connect_with_retry(
            cfg.gateway_addr.as_str(),
            cfg.connect_attempts,
            cfg.connect_retry_delay(),
        )
        .context("subscribe to gateway")?;
        conn.set_recv_timeout(Some(cfg.recv_timeout()))
            .context("set receive deadline")?;
        info!(peer = %conn.peer_addr(), "subscribed to gateway");

        let mut updates = 0u64;
        let mut last_stats = Instant::now();

        while !shutdown.is_set() {
            match conn.recv() {
                Ok(Some(msg)) => match msg.body {
                    Body::MarketData(md) => {
                        apply(writer, &md)?;
                        updates += 1;
                    }
                    Body::Shutdown => {
                        info!("gateway requested shutdown");
                        shutdown.request();
                    }
                    Body::Heartbeat => {}
                    other => debug!(kind = ?other, "ignoring unexpected kind"),
                },
                // Idle tick: nothing arrived before the deadline. Loop to
                // re-check the shutdown flag.
                Err(WireError::Timeout) => {}
                Ok(None) => {
                    warn!("gateway closed the stream, reconnecting");
                    continue 'reconnect;
                }
                Err(e) => {
                    warn!(error = %e, "receive failed, reconnecting");
                    continue 'reconnect;
                }
            }

            let elapsed = last_stats.elapsed();
            if elapsed >= cfg.stats_interval() {
                let rate = updates as f64 / elapsed.as_secs_f64();
                info!(updates, rate = %format_args!("{rate:.1}/s"), "book update rate");
                updates = 0;
                last_stats = Instant::now();
            }
        }
        break;
    }
    Ok(())
}

/// Publish one market data update into its slot.
fn apply(writer: &mut BookWriter, md: &MarketData) -> anyhow::Result<()> {
    let symbol = match Symbol::new(&md.symbol) {
        Ok(s) => s,
        Err(_) => {
            debug!(symbol = %md.symbol, "symbol does not fit a slot, skipping");
            return Ok(());
        }
    };
    let bids: Vec<(f64, f64)> = md.bids.iter().map(|l| (l.price, l.size)).collect();
    let asks: Vec<(f64, f64)> = md.asks.iter().map(|l| (l.price, l.size)).collect();

    match writer.write(symbol, &bids, &asks) {
        Ok(_) => Ok(()),
        // Feed and region symbol sets are both driven by the config; a
        // mismatch means another process runs a different config. Skip the
        // update, keep the region intact.
        Err(StoreError::UnknownSymbol(s)) => {
            debug!(symbol = %s, "no slot for symbol, skipping");
            Ok(())
        }
        Err(e) => Err(e).context("publish book update"),
    }
}
