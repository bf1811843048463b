//! Domain model: interfaces and their published projection, the operating
//! mode, the raw router configuration, and spoof-instance identity.

pub mod interface;
pub mod mode;
pub mod router_config;
pub mod spoof;

pub use interface::{Interface, InterfaceConfig, InterfaceMeta, InterfaceState, InterfaceType, NetworkInfo};
pub use mode::Mode;
pub use router_config::RouterConfig;
pub use spoof::{AddressFamily, SpoofInstance, SpoofKey, SpoofSelector};
