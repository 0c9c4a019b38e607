//! Order manager process: accepts order flow, simulates fills with slippage,
//! and journals every execution to the trade log.

mod trade_log;

use anyhow::Context;
use basalt_config::SystemConfig;
use basalt_util::{ShutdownFlag, now_secs};
use basalt_wire::{Body, ExecStatus, Execution, FramedConn, Order, WireError};
use rand::Rng;
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use trade_log::TradeLog;

#[derive(Default)]
struct Totals {
    orders: u64,
    executed: u64,
    volume: f64,
}

fn main() -> anyhow::Result<()> {
    let cfg = SystemConfig::load_or_default(std::env::args().nth(1))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&cfg.log_level))
        .init();

    let shutdown = ShutdownFlag::install();
    let listener = TcpListener::bind(&cfg.ordermanager_addr)
        .with_context(|| format!("bind {}", cfg.ordermanager_addr))?;
    listener.set_nonblocking(true)?;

    let log = Arc::new(Mutex::new(
        TradeLog::open(&cfg.trade_log).with_context(|| format!("open {}", cfg.trade_log))?,
    ));
    let totals = Arc::new(Mutex::new(Totals::default()));

    info!(addr = %cfg.ordermanager_addr, log = %cfg.trade_log, "order manager accepting clients");

    let mut workers = Vec::new();
    let mut last_stats = Instant::now();
    while !shutdown.is_set() {
        match listener.accept() {
            Ok((stream, peer)) => {
                info!(%peer, "client connected");
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!(%peer, error = %e, "could not restore blocking mode");
                    continue;
                }
                let cfg = cfg.clone();
                let log = Arc::clone(&log);
                let totals = Arc::clone(&totals);
                workers.push(std::thread::spawn(move || {
                    serve_client(stream, cfg, shutdown, log, totals)
                }));
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                error!(error = %e, "accept failed");
                break;
            }
        }

        if last_stats.elapsed() >= cfg.stats_interval() {
            let t = totals.lock().expect("totals lock");
            info!(
                orders = t.orders,
                executed = t.executed,
                volume = %format_args!("${:.2}", t.volume),
                "order flow statistics"
            );
            last_stats = Instant::now();
        }
    }

    info!("order manager draining client threads");
    for handle in workers {
        let _ = handle.join();
    }

    let t = totals.lock().expect("totals lock");
    info!(
        orders = t.orders,
        executed = t.executed,
        volume = %format_args!("${:.2}", t.volume),
        "final statistics"
    );
    Ok(())
}

fn serve_client(
    stream: TcpStream,
    cfg: SystemConfig,
    shutdown: ShutdownFlag,
    log: Arc<Mutex<TradeLog>>,
    totals: Arc<Mutex<Totals>>,
) {
    let peer = stream
        .peer_addr()
        .map(|p| p.to_string())
        .unwrap_or_else(|_| "<unknown>".into());
    let mut conn = match FramedConn::from_stream(stream) {
        Ok(c) => c,
        Err(e) => {
            warn!(%peer, error = %e, "could not frame client stream");
            return;
        }
    };
    if let Err(e) = conn.set_recv_timeout(Some(cfg.recv_timeout())) {
        warn!(%peer, error = %e, "could not set receive deadline");
        return;
    }

    while !shutdown.is_set() {
        match conn.recv() {
            Ok(Some(msg)) => match msg.body {
                Body::Order(order) => {
                    info!(
                        order_id = %order.order_id,
                        side = ?order.side,
                        quantity = order.quantity,
                        symbol = %order.symbol,
                        price = order.price,
                        "order received"
                    );
                    let execution = fill(&order);

                    {
                        let mut t = totals.lock().expect("totals lock");
                        t.orders += 1;
                        t.executed += 1;
                        t.volume += f64::from(order.quantity) * execution.execution_price;
                    }

                    if let Err(e) = log.lock().expect("trade log lock").append(&execution) {
                        // The fill happened; losing the journal line is an
                        // operational problem, not a reason to drop the client.
                        error!(execution_id = %execution.execution_id, error = %e, "trade log append failed");
                    }
                    info!(execution_id = %execution.execution_id, status = ?execution.status, "order executed");
                }
                Body::Shutdown => {
                    info!(%peer, "client requested shutdown");
                    return;
                }
                Body::Heartbeat => {}
                _ => {}
            },
            Err(WireError::Timeout) => {}
            Ok(None) => {
                info!(%peer, "client disconnected");
                return;
            }
            Err(e) => {
                warn!(%peer, error = %e, "receive failed");
                return;
            }
        }
    }
}

/// Simulate a fill at the limit price with ±0.1% uniform slippage.
fn fill(order: &Order) -> Execution {
    let slippage = rand::thread_rng().gen_range(-0.001..0.001);
    let execution_price = order.price * (1.0 + slippage);

    Execution {
        execution_id: format!("EXEC_{}", (now_secs() * 1e6) as u64),
        order_id: order.order_id.clone(),
        symbol: order.symbol.clone(),
        side: order.side,
        quantity: order.quantity,
        order_price: order.price,
        execution_price: (execution_price * 100.0).round() / 100.0,
        status: ExecStatus::Filled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_wire::Side;

    #[test]
    fn fills_stay_within_the_slippage_band() {
        let order = Order {
            order_id: "ORD_1".into(),
            symbol: "AAPL".into(),
            side: Side::Buy,
            price: 150.00,
            quantity: 100,
            price_change: 0.006,
            sentiment: 0.5,
        };
        for _ in 0..100 {
            let execution = fill(&order);
            assert_eq!(execution.order_id, "ORD_1");
            assert_eq!(execution.status, ExecStatus::Filled);
            assert!((execution.execution_price - 150.0).abs() <= 150.0 * 0.001 + 0.01);
        }
    }
}
