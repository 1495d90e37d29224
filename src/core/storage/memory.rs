//! In-memory policy storage.

use super::{check_limit_and_offset, PolicyIter, Storage};
use crate::checker::Checker;
use crate::error::{GuardError, Result};
use crate::inquiry::Inquiry;
use crate::policy::Policy;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Stores all policies in memory, ordered by uid.
///
/// `find_for_inquiry` returns every stored policy regardless of the checker,
/// which makes this storage the reference for what the guard decides when
/// candidates are not narrowed at all.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    policies: RwLock<BTreeMap<String, Arc<Policy>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage {
            policies: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored policies
    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.read().is_empty()
    }

    /// Consistent copy of the stored policies, taken under one read lock
    fn snapshot(&self) -> Vec<Arc<Policy>> {
        self.policies.read().values().cloned().collect()
    }
}

/// Yield owned policies one at a time from a snapshot
pub(super) fn feed(snapshot: Vec<Arc<Policy>>) -> PolicyIter<'static> {
    Box::new(
        snapshot
            .into_iter()
            .map(|policy| Ok(Policy::clone(&policy))),
    )
}

impl Storage for MemoryStorage {
    fn add(&self, policy: Policy) -> Result<()> {
        let mut policies = self.policies.write();
        if policies.contains_key(&policy.uid) {
            error!(
                "Error trying to create already existing policy with UID={}",
                policy.uid
            );
            return Err(GuardError::PolicyExists(policy.uid));
        }

        info!("Added policy with UID={}", policy.uid);
        policies.insert(policy.uid.clone(), Arc::new(policy));
        Ok(())
    }

    fn get(&self, uid: &str) -> Result<Option<Policy>> {
        Ok(self
            .policies
            .read()
            .get(uid)
            .map(|policy| Policy::clone(policy)))
    }

    fn get_all(&self, limit: i64, offset: i64) -> Result<PolicyIter<'_>> {
        let (limit, offset) = check_limit_and_offset(limit, offset)?;
        let page: Vec<Arc<Policy>> = self
            .policies
            .read()
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok(feed(page))
    }

    fn find_for_inquiry(
        &self,
        _inquiry: &Inquiry,
        _checker: &dyn Checker,
    ) -> Result<PolicyIter<'_>> {
        Ok(feed(self.snapshot()))
    }

    fn update(&self, policy: Policy) -> Result<()> {
        let mut policies = self.policies.write();
        match policies.get_mut(&policy.uid) {
            Some(slot) => {
                info!("Updated policy with UID={}", policy.uid);
                *slot = Arc::new(policy);
            }
            None => debug!("Skipping update of unknown policy UID={}", policy.uid),
        }
        Ok(())
    }

    fn delete(&self, uid: &str) -> Result<()> {
        if self.policies.write().remove(uid).is_some() {
            info!("Deleted policy with UID={}", uid);
        }
        Ok(())
    }
}
