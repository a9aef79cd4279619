//! Request context
//!
//! Context carried through one compile/projection/validation invocation.
//! Contains the caller identity used for tag visibility and authoring
//! attribution, plus observability metadata.

use std::time::Instant;

use uuid::Uuid;

/// Caller identity supplied by the transport layer.
///
/// Tags may restrict which users or groups can resolve them; the registry
/// checks membership against this identity. The definition compiler stamps
/// `created_by` on field version records from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// The authenticated user's ID, if any
    pub user_id: Option<Uuid>,
    /// Group memberships
    pub groups: Vec<String>,
}

impl Identity {
    /// An unauthenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated caller with no group memberships.
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            groups: Vec::new(),
        }
    }

    /// Adds group memberships.
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// True when no user is attached.
    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }

    /// True when the identity belongs to the given group.
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

/// Context carried through one engine invocation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request ID for log correlation
    pub request_id: Uuid,
    /// Caller identity
    pub identity: Identity,
    /// Start time for duration tracking
    started_at: Instant,
}

impl RequestContext {
    /// Creates a new request context for the given identity.
    pub fn new(identity: Identity) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            identity,
            started_at: Instant::now(),
        }
    }

    /// Creates an anonymous context.
    pub fn anonymous() -> Self {
        Self::new(Identity::anonymous())
    }

    /// Elapsed time since the context was created, in milliseconds.
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::anonymous()
    }
}
