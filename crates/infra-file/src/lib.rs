// Relay Infrastructure - File Adapters
// Implements: TargetStore, account/target list loading

pub mod list_loader;
pub mod target_store_impl;

pub use list_loader::{load_accounts, load_targets, parse_account_lines, parse_target_lines};
pub use target_store_impl::FileTargetStore;
