pub mod error;
pub mod query;
pub mod transport;
pub mod wire;

#[cfg(test)]
mod fake;

pub use error::*;
pub use query::*;
pub use transport::*;

#[cfg(test)]
mod tests {
    use super::{ApiError, ApiTransport, HttpTransport, TaskDirectory, TaskQueryService};
    use std::any::TypeId;

    #[test]
    fn crate_root_reexports_types() {
        let _ = TypeId::of::<ApiError>();
        let _ = TypeId::of::<HttpTransport>();
        let _ = TypeId::of::<TaskQueryService<HttpTransport>>();
    }

    #[test]
    fn seams_are_object_safe() {
        fn _directory(_: &dyn TaskDirectory) {}
        fn _transport(_: &dyn ApiTransport) {}
    }
}
