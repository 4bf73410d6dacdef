pub mod builders;
pub mod recording;
pub mod strategies;
pub mod test_db;

pub use builders::*;
pub use recording::*;
pub use test_db::*;
