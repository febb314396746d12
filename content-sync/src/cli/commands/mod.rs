pub mod nodes;
pub mod schema;
pub mod sync;
