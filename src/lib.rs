pub mod cli;
pub mod error;
pub mod folder_view;
pub mod path_codec;
pub mod populate;
pub mod tree;

pub use error::{Result, ViewerError};
