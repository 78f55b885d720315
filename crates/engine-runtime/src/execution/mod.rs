pub mod command;
pub mod query;
pub mod rows;

pub use command::QueryCommand;
pub use query::QueryExecution;
