//! Higher-level operations built on top of the scan/plan/sort/exec
//! pipeline: adopting an existing file, unmanaging a package, remanaging
//! everything that's changed, and bootstrapping a fresh machine from a
//! profile.

pub mod adopt;
pub mod bootstrap;
pub mod remanage;
pub mod unmanage;

pub use adopt::adopt;
pub use remanage::{remanage_all, RemanageReport};
pub use unmanage::{unmanage, UnmanageReport};
