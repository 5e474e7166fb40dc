use labeled_frame::{Content, Index, TypedArray};

/// Daily closing prices for a handful of tickers, one column per ticker.
pub fn sample_prices() -> labeled_frame::Result<Content<i32, String>> {
    let days = Index::new(1..=10)?;
    let tickers = ["AAPL", "MSFT", "NVDA"];
    let columns = tickers.iter().enumerate().map(|(i, ticker)| {
        let base = 100.0 * (i + 1) as f64;
        let prices: Vec<f64> = (1..=10)
            .map(|day| base + (day as f64 * 7.3 + i as f64).sin() * 5.0)
            .collect();
        (ticker.to_string(), TypedArray::from(prices))
    });
    Content::from_columns(days, columns)
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
