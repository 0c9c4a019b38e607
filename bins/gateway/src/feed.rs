//! Synthetic market data and news sentiment generation.

use basalt_wire::{Level, MarketData, Sentiment, Tone};
use rand::Rng;
use rand::rngs::ThreadRng;

pub struct Feed {
    rng: ThreadRng,
}

impl Feed {
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// A five-level book around a random base price with a 0.1% half-spread.
    /// Bids come out descending, asks ascending — the ordering every consumer
    /// downstream relies on.
    pub fn market_data(&mut self, symbol: &str) -> MarketData {
        let base: f64 = self.rng.gen_range(100.0..500.0);
        let spread = base * 0.001;

        let mut bids = Vec::with_capacity(5);
        let mut asks = Vec::with_capacity(5);
        for i in 0..5 {
            let size = round2(self.rng.gen_range(100.0..1000.0));
            bids.push(Level {
                price: round2(base - spread - i as f64 * 0.1),
                size,
            });
            asks.push(Level {
                price: round2(base + spread + i as f64 * 0.1),
                size,
            });
        }

        MarketData {
            symbol: symbol.to_string(),
            bids,
            asks,
            last_price: round2(base),
            volume: self.rng.gen_range(1_000..100_000),
        }
    }

    /// Sentiment for one randomly chosen symbol, score in [-1, 1].
    pub fn sentiment(&mut self, symbols: &[String]) -> Sentiment {
        let symbol = symbols[self.rng.gen_range(0..symbols.len())].clone();
        let tone = match self.rng.gen_range(0..3) {
            0 => Tone::Positive,
            1 => Tone::Negative,
            _ => Tone::Neutral,
        };
        let score = match tone {
            Tone::Positive => self.rng.gen_range(0.3..1.0),
            Tone::Negative => self.rng.gen_range(-1.0..-0.3),
            Tone::Neutral => self.rng.gen_range(-0.2..0.2),
        };
        let label = match tone {
            Tone::Positive => "Positive",
            Tone::Negative => "Negative",
            Tone::Neutral => "Neutral",
        };

        Sentiment {
            headline: format!("{label} news for {symbol}"),
            tone,
            score: round3(score),
            symbol,
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
