pub mod config;
pub mod error;
pub mod index;
pub mod logging;
pub mod mcp;
pub mod model;
pub mod normalize;
pub mod output;
pub mod query;
pub mod server;
pub mod source;

pub use config::Config;
pub use error::{IndexError, QueryError, SourceError};
pub use index::{AdvisoryIndex, IndexStats};
pub use model::{Advisory, AdvisoryListOptions, Ecosystem, SearchOptions, SeverityLevel};
pub use source::AdvisorySource;
