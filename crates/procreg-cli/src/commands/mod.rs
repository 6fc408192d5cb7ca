pub mod documents;
pub mod export;
pub mod indexes;
