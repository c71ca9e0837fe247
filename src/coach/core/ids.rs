//! Identifier types for coach sessions.
//!
//! User and conversation identifiers are opaque caller-supplied strings. When a
//! caller omits one, a random UUID v4 is generated and echoed back so the same
//! [`SessionKey`] can be resumed on the next request.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declare an opaque string identifier with a consistent API.
macro_rules! define_opaque_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Use a caller-supplied identifier, generating one when absent or blank.
            #[must_use]
            pub fn from_optional(value: Option<&str>) -> Self {
                match value {
                    Some(raw) if !raw.trim().is_empty() => Self(raw.to_string()),
                    _ => Self::generate(),
                }
            }

            /// Borrow the identifier text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_opaque_id!(
    /// Opaque user identifier.
    UserId
);

define_opaque_id!(
    /// Opaque conversation identifier.
    ConversationId
);

/// Composite key identifying exactly one transcript.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// Owner of the conversation.
    pub user_id: UserId,
    /// Conversation within that user's sessions.
    pub conversation_id: ConversationId,
}

impl SessionKey {
    /// Build a key from both parts.
    #[must_use]
    pub const fn new(user_id: UserId, conversation_id: ConversationId) -> Self {
        Self {
            user_id,
            conversation_id,
        }
    }

    /// Resolve a key from optional caller-supplied parts.
    #[must_use]
    pub fn resolve(user_id: Option<&str>, conversation_id: Option<&str>) -> Self {
        Self::new(
            UserId::from_optional(user_id),
            ConversationId::from_optional(conversation_id),
        )
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.conversation_id)
    }
}
