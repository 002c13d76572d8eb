pub mod defs;

pub use defs::{Episode, IncomparableError, WatchRecord, Wishlist};
