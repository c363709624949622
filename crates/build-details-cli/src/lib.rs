//! build-details library - expose modules for testing

pub mod common;
pub mod errors;
pub mod generate;

pub use build_details_logger as logger;
pub use common::GlobalOpts;
