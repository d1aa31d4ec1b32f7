//! Identifiers for units, calls and bootstraps.
//!
//! Each is a random UUID. They carry no meaning beyond identity and show up
//! in log lines and outcome reports.

use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from a UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// The first eight hex digits, for thread names and terse logs.
            pub fn short(&self) -> String {
                self.0.simple().to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifies one spawned execution unit.
    UnitId
);

uuid_id!(
    /// Identifies one dispatcher invocation.
    CallId
);

uuid_id!(
    /// Identifies one prepared bootstrap, shared by every call made through
    /// the dispatcher it was registered for.
    BootstrapId
);
