//! Domain models for the sales tracker

mod customer;
mod product;
mod settings;
mod user;
mod visit;

pub use customer::*;
pub use product::*;
pub use settings::*;
pub use user::*;
pub use visit::*;
