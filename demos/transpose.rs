use crate::utils::{init_tracing, sample_prices};
mod utils;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let prices = sample_prices()?;
    let by_ticker = prices.transpose();

    println!(
        "{} rows x {} columns (column store: {}) -> {} rows x {} columns (column store: {})",
        prices.row_count(),
        prices.col_count(),
        prices.is_column_store(),
        by_ticker.row_count(),
        by_ticker.col_count(),
        by_ticker.is_column_store()
    );

    let mut row = by_ticker.row_cursor();
    for ticker in by_ticker.row_keys().keys() {
        row.move_to(ticker)?;
        let mut total = 0.0;
        for day in 0..row.size() {
            total += row.get_double(day)?;
        }
        println!("{ticker}: mean close {:.2}", total / row.size() as f64);
    }
    Ok(())
}
