use crate::utils::{init_tracing, sample_prices};
mod utils;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let prices = sample_prices()?;

    // Odd days, two tickers; the view shares cells with `prices`
    let days = prices.row_keys().filter(|day| day % 2 == 1);
    let tickers = prices
        .col_keys()
        .filter_keys(["NVDA", "AAPL"].map(String::from))?;
    let view = prices.filter(days, tickers)?;

    for ordinal in 0..view.row_count() {
        let day = view.row_keys().key(ordinal)?;
        println!(
            "day {day:>2}: NVDA {:>8.2}  AAPL {:>8.2}",
            view.get_double(ordinal, 0)?,
            view.get_double(ordinal, 1)?
        );
    }

    view.set_double(&1, &"AAPL".to_string(), 0.0)?;
    println!(
        "write through view is visible in source: {}",
        prices.get_double(&1, &"AAPL".to_string())?
    );
    Ok(())
}
