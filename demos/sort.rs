use crate::utils::{init_tracing, sample_prices};
mod utils;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let mut prices = sample_prices()?;

    prices.sort_rows_by_column(false, &"MSFT".to_string(), false)?;
    println!("days ordered by MSFT close, highest first:");
    let mut row = prices.row_cursor();
    for ordinal in 0..prices.row_count() {
        row.move_to(ordinal)?;
        println!(
            "  day {:>2} (slot {}): {:.2}",
            row.key()?,
            prices.row_keys().get_index_for_ordinal(ordinal)?,
            row.get_double(&"MSFT".to_string())?
        );
    }

    prices.sort_rows_by(false, None);
    println!(
        "restored insertion order: {:?}",
        prices.row_keys().keys().collect::<Vec<_>>()
    );
    Ok(())
}
