mod coordinator;

pub use coordinator::create;
pub use coordinator::MembershipClient;
pub use coordinator::MembershipCoordinator;
pub use coordinator::MembershipEvent;
pub use coordinator::MembershipHandler;
