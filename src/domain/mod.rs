pub mod class;
pub mod outcome;
pub mod user;

pub use class::{ClassSnapshot, ClassSpec, Measure, ResultEntry};
pub use outcome::{ClassOutcome, CrawlError};
pub use user::{CrawlerConfig, Credentials, User, UserResults};
