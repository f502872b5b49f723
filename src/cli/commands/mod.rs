//! CLI command implementations

pub mod config;
pub mod locks;
pub mod lookup;
pub mod resolve;
pub mod roots;

pub use config::execute as config;
pub use locks::execute as locks;
pub use lookup::execute as lookup;
pub use resolve::execute as resolve;
pub use roots::execute as roots;
