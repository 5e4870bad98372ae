pub mod batch;
pub mod classification;
pub mod config;
pub mod constants;
pub mod grouping;
pub mod hits;
pub mod hitsieve_errors;
pub mod imaging;
pub mod io;

pub use batch::{analyse_hits_batch, BatchReport};
pub use config::Config;
pub use hits::Hit;
pub use hitsieve_errors::HitSieveError;
