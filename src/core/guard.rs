//! Access decisions with deny precedence
//!
//! The guard asks storage for candidate policies, re-checks every candidate with
//! its checker and decides:
//! - no relevant policy - deny
//! - any relevant deny policy - deny
//! - otherwise - allow
//!
//! Storage is free to over-approximate; the guard never trusts a candidate set.

use crate::checker::Checker;
use crate::error::Result;
use crate::inquiry::Inquiry;
use crate::policy::{Field, Policy};
use crate::storage::Storage;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Fields checked for relevance, cheapest-to-reject first
const RELEVANCE_ORDER: [Field; 3] = [Field::Actions, Field::Subjects, Field::Resources];

/// Decides inquiries against the policies in a storage
pub struct Guard {
    storage: Arc<dyn Storage>,
    checker: Box<dyn Checker>,
}

impl Guard {
    /// Create a guard over `storage` matching with `checker`
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use warden::{Effect, Guard, Inquiry, MemoryStorage, Policy, RegexChecker, Storage};
    ///
    /// let storage = Arc::new(MemoryStorage::new());
    /// storage
    ///     .add(
    ///         Policy::new(1)
    ///             .with_subjects(["<[Mm]ax>", "<Jim>"])
    ///             .with_actions(["get", "post"])
    ///             .with_resources(["<.*>"])
    ///             .with_effect(Effect::Allow),
    ///     )
    ///     .unwrap();
    ///
    /// let guard = Guard::new(storage, RegexChecker::new());
    /// assert!(guard.is_allowed(&Inquiry::new("Max", "get", "printer")));
    /// assert!(!guard.is_allowed(&Inquiry::new("Max", "delete", "printer")));
    /// ```
    pub fn new<C: Checker + 'static>(storage: Arc<dyn Storage>, checker: C) -> Self {
        Guard {
            storage,
            checker: Box::new(checker),
        }
    }

    /// Create a guard from an already boxed checker
    pub fn from_parts(storage: Arc<dyn Storage>, checker: Box<dyn Checker>) -> Self {
        Guard { storage, checker }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn checker(&self) -> &dyn Checker {
        self.checker.as_ref()
    }

    /// Is the inquiry allowed?
    ///
    /// Never fails: any error while deciding is logged and treated as deny.
    pub fn is_allowed(&self, inquiry: &Inquiry) -> bool {
        report(inquiry, self.is_allowed_silent(inquiry))
    }

    /// Decide without logging or swallowing errors
    pub fn is_allowed_silent(&self, inquiry: &Inquiry) -> Result<bool> {
        let candidates = self
            .storage
            .find_for_inquiry(inquiry, self.checker.as_ref())?;
        self.check_policies_allow(inquiry, candidates)
    }

    /// Decide over an explicit candidate set
    ///
    /// Stops at the first relevant deny policy. Errors from the candidate
    /// iterator or from matching propagate.
    pub fn check_policies_allow<I>(&self, inquiry: &Inquiry, policies: I) -> Result<bool>
    where
        I: IntoIterator<Item = Result<Policy>>,
    {
        let mut allowed = false;
        for policy in policies {
            let policy = policy?;
            if !self.is_relevant(&policy, inquiry)? {
                continue;
            }
            if !policy.allow_access() {
                debug!("Inquiry denied by policy UID={}", policy.uid);
                return Ok(false);
            }
            allowed = true;
        }
        Ok(allowed)
    }

    /// Does the inquiry context satisfy every context rule of the policy?
    ///
    /// A rule whose key is missing from the inquiry context is not satisfied.
    pub fn check_context_restriction(&self, policy: &Policy, inquiry: &Inquiry) -> Result<bool> {
        for (key, rule) in &policy.context {
            let Some(value) = inquiry.context.get(key) else {
                debug!(
                    "Inquiry context has no key '{}' required by policy UID={}",
                    key, policy.uid
                );
                return Ok(false);
            };
            if !rule.satisfied(value, inquiry)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn is_relevant(&self, policy: &Policy, inquiry: &Inquiry) -> Result<bool> {
        for field in RELEVANCE_ORDER {
            if !self
                .checker
                .fits(policy, field, inquiry.value(field), inquiry)?
            {
                return Ok(false);
            }
        }
        self.check_context_restriction(policy, inquiry)
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("checker", &self.checker.kind())
            .finish_non_exhaustive()
    }
}

/// Log a decision and turn failures into deny
pub(crate) fn report(inquiry: &Inquiry, decision: Result<bool>) -> bool {
    match decision {
        Ok(true) => {
            info!("Incoming inquiry was allowed: {}", inquiry);
            true
        }
        Ok(false) => {
            info!("Incoming inquiry was rejected: {}", inquiry);
            false
        }
        Err(e) => {
            error!("Unexpected error while deciding {}: {}", inquiry, e);
            false
        }
    }
}
