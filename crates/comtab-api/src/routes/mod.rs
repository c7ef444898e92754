pub mod standards;
pub mod updates;
