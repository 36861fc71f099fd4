mod addr;
pub use addr::{join_host_port, split_host_port};

mod url;
pub use url::ServiceUrl;
pub(crate) use url::empty_as_none;

mod environ;
pub use environ::Environ;

mod cluster_type;
pub use cluster_type::ClusterType;
