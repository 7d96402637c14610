pub mod format;
pub mod inspect;
pub mod versions;
pub mod watch;
