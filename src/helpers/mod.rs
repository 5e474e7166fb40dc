pub mod parallel;
pub mod sort;
