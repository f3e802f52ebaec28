pub mod daemon;
pub mod export;
pub mod init;
pub mod version;

pub use daemon::Daemon;
pub use export::Export;
pub use init::Init;
pub use version::Version;
