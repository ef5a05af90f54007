//! Tri-state result for pipeline stages that are allowed to degrade.
//!
//! A stage either succeeds, produces a usable fallback value together with the
//! reason it had to fall back, or fails in a way the request cannot recover
//! from. Callers have to match on the variant, so a degraded value is never
//! mistaken for a clean success.

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The stage produced its intended value.
    Success(T),
    /// The stage fell back to `value`; `reason` says why.
    Degraded { value: T, reason: String },
    /// The stage cannot produce a value for this input.
    Fatal(String),
}

impl<T> Outcome<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Borrow the value of a successful or degraded outcome.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) | Self::Degraded { value, .. } => Some(value),
            Self::Fatal(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Success(value) | Self::Degraded { value, .. } => Some(value),
            Self::Fatal(_) => None,
        }
    }

    /// The fallback or failure reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Degraded { reason, .. } | Self::Fatal(reason) => Some(reason),
        }
    }
}
