pub mod extract;
pub mod materialize;
