//! Spoof instance registry and debounced lifecycle management for the
//! OS-level traffic-interception processes.

pub mod lifecycle;
pub mod registry;

pub use lifecycle::{ActiveDevice, SpoofLifecycleManager, DEMOTION_GRACE, RESTART_QUIET_WINDOW};
pub use registry::SpoofInstanceRegistry;
