//! Policy storage.
//!
//! Storage adapters persist policies and hand the guard a *candidate* set for
//! each inquiry. Candidates may include policies that do not actually match
//! (the guard re-checks every one of them) but must never omit one that does.

mod indexed;
mod memory;

pub use indexed::IndexedStorage;
pub use memory::MemoryStorage;

use crate::checker::Checker;
use crate::error::{GuardError, Result};
use crate::inquiry::Inquiry;
use crate::policy::Policy;

/// Lazily produced policies
pub type PolicyIter<'a> = Box<dyn Iterator<Item = Result<Policy>> + Send + 'a>;

/// Trait for policy storage.
///
/// Absence is never an error: `get` returns `None`, `update` and `delete` of an
/// unknown uid do nothing. Adapters translate their own failures into
/// [`GuardError`] before returning.
pub trait Storage: Send + Sync {
    /// Store a new policy.
    ///
    /// # Errors
    ///
    /// * `PolicyExists` - If a policy with the same uid is already stored.
    fn add(&self, policy: Policy) -> Result<()>;

    /// Get a policy by uid.
    fn get(&self, uid: &str) -> Result<Option<Policy>>;

    /// Page through stored policies in a stable order.
    ///
    /// # Errors
    ///
    /// * `InvalidPagination` - If `limit` or `offset` is negative.
    fn get_all(&self, limit: i64, offset: i64) -> Result<PolicyIter<'_>>;

    /// Candidate policies for an inquiry under the given checker.
    ///
    /// # Errors
    ///
    /// * `UnrecognizedChecker` - If the adapter narrows candidates per checker
    ///   kind and cannot interpret this one.
    fn find_for_inquiry(&self, inquiry: &Inquiry, checker: &dyn Checker)
        -> Result<PolicyIter<'_>>;

    /// Replace a stored policy; no-op when the uid is unknown.
    fn update(&self, policy: Policy) -> Result<()>;

    /// Remove a policy; no-op when the uid is unknown.
    fn delete(&self, uid: &str) -> Result<()>;
}

/// Validate `get_all` arguments and convert them to sizes
pub fn check_limit_and_offset(limit: i64, offset: i64) -> Result<(usize, usize)> {
    if limit < 0 {
        return Err(GuardError::InvalidPagination(
            "Limit can't be negative".to_string(),
        ));
    }
    if offset < 0 {
        return Err(GuardError::InvalidPagination(
            "Offset can't be negative".to_string(),
        ));
    }
    Ok((
        usize::try_from(limit).unwrap_or(usize::MAX),
        usize::try_from(offset).unwrap_or(usize::MAX),
    ))
}

/// Lazily walk every stored policy, `batch` policies per `get_all` call
///
/// # Examples
///
/// ```
/// use warden::{retrieve_all, MemoryStorage, Policy, Storage};
///
/// let storage = MemoryStorage::new();
/// for i in 0..5 {
///     storage.add(Policy::new(i)).unwrap();
/// }
///
/// let uids: Vec<String> = retrieve_all(&storage, 2)
///     .map(|p| p.unwrap().uid)
///     .collect();
/// assert_eq!(uids, ["0", "1", "2", "3", "4"]);
/// ```
pub fn retrieve_all<S: Storage + ?Sized>(storage: &S, batch: usize) -> RetrieveAll<'_, S> {
    RetrieveAll {
        storage,
        batch: batch.max(1),
        offset: 0,
        page: None,
        page_len: 0,
        done: false,
    }
}

/// Iterator returned by [`retrieve_all`]
pub struct RetrieveAll<'a, S: Storage + ?Sized> {
    storage: &'a S,
    batch: usize,
    offset: usize,
    page: Option<PolicyIter<'a>>,
    page_len: usize,
    done: bool,
}

impl<'a, S: Storage + ?Sized> Iterator for RetrieveAll<'a, S> {
    type Item = Result<Policy>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if let Some(page) = self.page.as_mut() {
                if let Some(item) = page.next() {
                    self.page_len += 1;
                    return Some(item);
                }
                // A short page means the store is exhausted
                self.page = None;
                if self.page_len < self.batch {
                    self.done = true;
                    return None;
                }
                self.offset += self.page_len;
            }

            self.page_len = 0;
            let limit = i64::try_from(self.batch).unwrap_or(i64::MAX);
            let offset = i64::try_from(self.offset).unwrap_or(i64::MAX);
            match self.storage.get_all(limit, offset) {
                Ok(page) => self.page = Some(page),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
