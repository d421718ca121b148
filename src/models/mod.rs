pub mod diagnostics;
pub mod error;
pub mod health;
pub mod messages;
pub mod note;
pub mod note_api;

pub use diagnostics::*;
pub use error::*;
pub use health::*;
pub use messages::*;
pub use note::*;
pub use note_api::*;

#[cfg(test)]
mod tests;
