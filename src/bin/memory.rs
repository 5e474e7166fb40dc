use labeled_frame::{ArrayType, Content, IndexFactory};

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn main() -> labeled_frame::Result<()> {
    let _profiler = dhat::Profiler::new_heap();

    let factory = IndexFactory::default();
    let cols = factory.create((0..8).map(|c| format!("c{c}")))?;
    let mut content = Content::new(factory.empty::<i64>(), cols, ArrayType::Double);

    // Row-at-a-time growth exercises geometric capacity expansion
    for key in 0..1_000_000i64 {
        content.add_row(key)?;
    }

    let rows = content.row_keys().filter(|k| k % 3 == 0);
    let view = content.filter(rows, content.col_keys().clone())?;
    let _copy = view.copy()?;

    println!("Memory benchmark finished. See dhat-heap.json for details");
    Ok(())
}
