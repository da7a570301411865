//! Which tables a user type synchronizes.
//!
//! The policy itself is data: each [`TableDescriptor`] carries its role set in
//! the static catalog. These functions only read it.

use std::collections::BTreeSet;

use crate::catalog::{TableDescriptor, catalog};
use crate::models::{TableId, UserType};

/// One catalog entry as seen by a particular user type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTable {
    pub descriptor: &'static TableDescriptor,
    pub eligible: bool,
}

/// Tables `user_type` is allowed to synchronize.
pub fn allowed_tables(user_type: UserType) -> BTreeSet<TableId> {
    catalog()
        .iter()
        .filter(|descriptor| descriptor.includes(user_type))
        .map(|descriptor| descriptor.table_id)
        .collect()
}

/// The whole catalog in master order, flagged with eligibility for `user_type`.
pub fn sync_plan(user_type: UserType) -> Vec<PlannedTable> {
    catalog()
        .iter()
        .map(|descriptor| PlannedTable {
            descriptor,
            eligible: descriptor.includes(user_type),
        })
        .collect()
}
