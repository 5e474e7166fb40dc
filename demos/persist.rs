use labeled_frame::Content;

use crate::utils::{init_tracing, sample_prices};
mod utils;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let prices = sample_prices()?;
    let recent = prices.row_keys().filter(|day| *day > 5);
    let view = prices.filter(recent, prices.col_keys().clone())?;

    let path = std::env::temp_dir().join("prices.lfrm");
    view.save(&path)?;
    let loaded = Content::<i32, String>::load(&path)?;

    println!(
        "saved {} of {} days to {}; reloaded {} days, filtered: {}",
        view.row_count(),
        prices.row_count(),
        path.display(),
        loaded.row_count(),
        loaded.row_keys().is_filter()
    );
    std::fs::remove_file(&path)?;
    Ok(())
}
