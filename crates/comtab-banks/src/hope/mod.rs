//! HOPE adapter: readers, row mapping, output rules and writer for the HOPE
//! product report / internal commissioning table pair.

pub mod complement;
pub mod mapper;
pub mod reader;
pub mod rules;
pub mod writer;
