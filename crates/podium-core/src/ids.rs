//! Branded ID newtypes for type safety.
//!
//! Every identifier that crosses a module boundary is a distinct newtype
//! around `String`, so a song reference can never be passed where a user ID
//! is expected. Only IDs minted by this server (`ConnectionId`) can be
//! generated; the others originate in external systems and are only wrapped.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Identifier of one live transport connection (minted by the gateway).
    ConnectionId
}

branded_id! {
    /// Identifier of an authenticated user, as issued by the identity provider.
    UserId
}

branded_id! {
    /// Opaque reference to a song in the external catalog.
    SongRef
}

impl ConnectionId {
    /// Create a new connection ID (`conn_` + UUID v7, time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(format!("conn_{}", Uuid::now_v7()))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}
