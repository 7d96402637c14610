pub mod coordinator;
pub mod debounce;
pub mod descriptor;
pub mod locator;
pub mod provider;
pub mod report;
pub mod resolve;
pub mod transport;

pub use coordinator::{FetchState, UpdateCoordinator, UpdateEvent};
pub use debounce::Debouncer;
pub use descriptor::{IndexFile, PackFormat, Snapshot, parse_descriptor};
pub use locator::{Locator, Scheme};
pub use provider::{
    Endpoints, FlatIndexProvider, IndexFormat, LoaderKind, PairedListProvider, VersionProvider,
};
pub use report::FailureReport;
pub use resolve::{Resolution, resolve};
pub use transport::{MetaError, Transport};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
