use std::process;
use std::time::Instant;

use jemallocator::Jemalloc;
use labeled_frame::{ArrayType, Content, FrameConfig, IndexFactory};
use rand::Rng;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn run(rows: i64) -> labeled_frame::Result<()> {
    let config = FrameConfig::from_env();
    let factory = IndexFactory::new(config);

    let mut row_keys = factory.empty::<i64>();
    row_keys.add_all(0..rows, false)?;
    let col_keys = factory.create(["open", "close", "volume"].map(String::from))?;
    let mut content = Content::new(row_keys, col_keys, ArrayType::Double).with_config(config);

    let start = Instant::now();
    let mut rng = rand::rng();
    let mut cursor = content.cursor();
    for row in 0..content.row_count() {
        cursor.move_to_row(row)?;
        for col in 0..content.col_count() {
            cursor.move_to_col(col)?;
            cursor.set_double(rng.random_range(1.0..1_000.0))?;
        }
    }
    println!("filled {} cells in {:?}", rows * 3, start.elapsed());

    let start = Instant::now();
    content.apply_doubles(true, |cell| cell.get_double().map_or(f64::NAN, |v| v.round()))?;
    println!("rounded every cell in {:?}", start.elapsed());

    let start = Instant::now();
    content.sort_rows_by_column(config.parallel_sort, &"close".to_string(), false)?;
    println!("sorted rows by close in {:?}", start.elapsed());

    let start = Instant::now();
    let gainers = content.select_rows(true, |row| {
        match (row.get_double(0), row.get_double(1)) {
            (Ok(open), Ok(close)) => close > open,
            _ => false,
        }
    })?;
    println!(
        "selected {} of {} rows in {:?}",
        gainers.row_count(),
        content.row_count(),
        start.elapsed()
    );

    let start = Instant::now();
    let compact = gainers.copy()?;
    println!(
        "compacted view into {} rows in {:?}",
        compact.row_count(),
        start.elapsed()
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let rows = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(1_000_000);

    if let Err(err) = run(rows) {
        tracing::error!("run failed: {err}");
        process::exit(1);
    }
}
