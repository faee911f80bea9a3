pub mod models;
pub mod queries;
pub mod sqlite;

pub use models::{Directory, DirectorySet, Stat};
pub use sqlite::{clean, Database};
