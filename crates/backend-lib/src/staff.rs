// ============================
// crates/backend-lib/src/staff.rs
// ============================
//! Pre-issued staff bearer credentials.
//!
//! Issuing and rotating these tokens belongs to the wider product's auth
//! system; this directory only answers "which role does this bearer
//! token carry".
use dashmap::DashMap;
use eventdesk_common::Role;

use crate::config::StaffCredential;

#[derive(Default)]
pub struct StaffDirectory {
    tokens: DashMap<String, Role>,
}

impl StaffDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_credentials(credentials: &[StaffCredential]) -> Self {
        let directory = Self::new();
        for credential in credentials {
            directory.insert(&credential.token, credential.role);
        }
        directory
    }

    pub fn insert(&self, token: &str, role: Role) {
        self.tokens.insert(token.to_string(), role);
    }

    pub fn role_for(&self, token: &str) -> Option<Role> {
        self.tokens.get(token).map(|r| *r)
    }
}
