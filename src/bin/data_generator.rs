use std::fs;
use std::path::Path;

use labeled_frame::{Content, Index, TypedArray};
use rand::Rng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new("data/prices.lfrm");
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let rows = 10_000_000;
    let mut rng = rand::rng();
    let regions = ["US", "EU", "ASIA", "AFRICA", "AUSTRALIA", "SOUTH AMERICA"];

    let value: Vec<i64> = (0..rows).map(|_| rng.random_range(1..1000)).collect();
    let price: Vec<f64> = (0..rows).map(|_| rng.random_range(0.0..100.0)).collect();
    let region: Vec<Option<String>> = (0..rows)
        .map(|_| Some(regions[rng.random_range(0..regions.len())].to_string()))
        .collect();

    let content = Content::from_columns(
        Index::new(0..rows as i64)?,
        vec![
            ("value".to_string(), TypedArray::from(value)),
            ("price".to_string(), TypedArray::from(price)),
            ("region".to_string(), TypedArray::from(region)),
        ],
    )?;
    content.save(path)?;

    println!("Sample table generated: {}", path.display());
    Ok(())
}
