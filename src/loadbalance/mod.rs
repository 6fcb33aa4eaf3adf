mod client;
mod picker;
mod resolver;

pub use client::ClientError;
pub use client::ClusterClient;
pub use picker::Address;
pub use picker::MethodClass;
pub use picker::PickError;
pub use picker::Picker;
pub use resolver::ResolveError;
pub use resolver::ResolvedState;
pub use resolver::Resolver;
pub use resolver::SCHEME;
