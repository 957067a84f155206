pub mod checkpoint;
pub mod domain;
pub mod registry;
