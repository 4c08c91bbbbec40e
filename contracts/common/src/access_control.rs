//! Access Control Module
//!
//! Single-owner capability check. No vault operation is owner-restricted;
//! this is the boundary future administrative hooks go through.

use crate::errors::{VaultError, VaultResult};
use crate::types::Address;

/// True if `caller` holds the owner capability
pub fn is_authorized(caller: &Address, owner: &Address) -> bool {
    caller == owner
}

/// Fail with `Unauthorized` unless `caller` is the owner
pub fn require_owner(caller: &Address, owner: &Address) -> VaultResult<()> {
    if !is_authorized(caller, owner) {
        return Err(VaultError::Unauthorized {
            expected: *owner,
            actual: *caller,
        });
    }
    Ok(())
}
