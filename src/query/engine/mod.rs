mod engine;
mod local;
mod session;

pub use engine::{Catalog, Engine, Transaction};
pub use local::Local;
pub use session::{Session, StatementResult};
