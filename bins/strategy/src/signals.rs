//! Signal rules: price momentum confirmed by news sentiment.

use basalt_store::BookReader;
use basalt_util::now_secs;
use basalt_wire::{MarketData, Order, Sentiment, Side};
use rand::Rng;
use std::collections::HashMap;

/// Weight of the newest sentiment score in the running average.
const SENTIMENT_ALPHA: f64 = 0.3;

pub struct SignalEngine {
    price_change_threshold: f64,
    sentiment_threshold: f64,
    last_prices: HashMap<String, f64>,
    sentiment: HashMap<String, f64>,
    pub signals: u64,
}

impl SignalEngine {
    pub fn new(price_change_threshold: f64, sentiment_threshold: f64) -> Self {
        Self {
            price_change_threshold,
            sentiment_threshold,
            last_prices: HashMap::new(),
            sentiment: HashMap::new(),
            signals: 0,
        }
    }

    /// Fold a sentiment reading into the symbol's running average.
    pub fn on_sentiment(&mut self, s: &Sentiment) {
        let entry = self.sentiment.entry(s.symbol.clone()).or_insert(0.0);
        *entry = SENTIMENT_ALPHA * s.score + (1.0 - SENTIMENT_ALPHA) * *entry;
    }

    /// Evaluate an update against the thresholds; an aligned price move and
    /// sentiment produces an order.
    ///
    /// The order is priced off the shared book's consistent mid when a
    /// snapshot is available; a torn read (bounded retries exhausted) or an
    /// empty side just falls back to the feed's last price for this cycle.
    pub fn on_market_data(&mut self, md: &MarketData, book: Option<&BookReader>) -> Option<Order> {
        let price = md.last_price;
        if price <= 0.0 {
            return None;
        }
        // First sighting seeds the reference price, no signal yet.
        let last = self.last_prices.insert(md.symbol.clone(), price)?;

        let price_change = (price - last) / last;
        let sentiment = self.sentiment.get(&md.symbol).copied().unwrap_or(0.0);

        let side = if price_change > self.price_change_threshold
            && sentiment > self.sentiment_threshold
        {
            Side::Buy
        } else if price_change < -self.price_change_threshold
            && sentiment < -self.sentiment_threshold
        {
            Side::Sell
        } else {
            return None;
        };
        self.signals += 1;

        let limit = book
            .and_then(|reader| {
                let sym = basalt_store::Symbol::new(&md.symbol).ok()?;
                reader.read(sym).ok()
            })
            .and_then(|snap| snap.mid())
            .unwrap_or(price);

        Some(Order {
            order_id: format!("ORD_{}", (now_secs() * 1e6) as u64),
            symbol: md.symbol.clone(),
            side,
            price: (limit * 100.0).round() / 100.0,
            quantity: rand::thread_rng().gen_range(10..=100),
            price_change,
            sentiment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_wire::{Level, Tone};

    fn engine() -> SignalEngine {
        SignalEngine::new(0.005, 0.3)
    }

    fn md(symbol: &str, price: f64) -> MarketData {
        MarketData {
            symbol: symbol.into(),
            bids: vec![Level { price: price - 0.05, size: 100.0 }],
            asks: vec![Level { price: price + 0.05, size: 100.0 }],
            last_price: price,
            volume: 1_000,
        }
    }

    fn sentiment(symbol: &str, score: f64) -> Sentiment {
        Sentiment {
            symbol: symbol.into(),
            tone: if score > 0.0 { Tone::Positive } else { Tone::Negative },
            score,
            headline: String::new(),
        }
    }

    #[test]
    fn first_update_only_seeds_the_reference_price() {
        let mut engine = engine();
        assert!(engine.on_market_data(&md("AAPL", 150.0), None).is_none());
    }

    #[test]
    fn rising_price_with_positive_sentiment_buys() {
        let mut engine = engine();
        // Push the running average well over the threshold.
        for _ in 0..8 {
            engine.on_sentiment(&sentiment("AAPL", 0.9));
        }
        assert!(engine.on_market_data(&md("AAPL", 150.0), None).is_none());

        let order = engine
            .on_market_data(&md("AAPL", 152.0), None)
            .expect("aligned move and sentiment");
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.symbol, "AAPL");
        assert_eq!(order.price, 152.0);
        assert!((10..=100).contains(&order.quantity));
        assert!(order.price_change > 0.005);
    }

    #[test]
    fn falling_price_with_negative_sentiment_sells() {
        let mut engine = engine();
        for _ in 0..8 {
            engine.on_sentiment(&sentiment("TSLA", -0.9));
        }
        assert!(engine.on_market_data(&md("TSLA", 200.0), None).is_none());

        let order = engine
            .on_market_data(&md("TSLA", 197.0), None)
            .expect("aligned move and sentiment");
        assert_eq!(order.side, Side::Sell);
    }

    #[test]
    fn price_move_without_sentiment_stays_quiet() {
        let mut engine = engine();
        assert!(engine.on_market_data(&md("MSFT", 400.0), None).is_none());
        assert!(engine.on_market_data(&md("MSFT", 410.0), None).is_none());
    }

    #[test]
    fn sentiment_average_converges_towards_new_scores() {
        let mut engine = engine();
        engine.on_sentiment(&sentiment("AMZN", 1.0));
        let first = *engine.sentiment.get("AMZN").unwrap();
        assert!((first - 0.3).abs() < 1e-9);

        engine.on_sentiment(&sentiment("AMZN", 1.0));
        let second = *engine.sentiment.get("AMZN").unwrap();
        assert!(second > first && second < 1.0);
    }
}
