pub mod bag;
pub mod pool;

pub use bag::Bag;
pub use pool::IdPool;
