use crate::common::Result;
use crate::query::engine::Transaction;
use crate::storage::Namespace;
use crate::types::Documents;
use log::debug;

/// A collection source via sequential scan. A missing collection yields
/// nothing.
pub fn scan(txn: &impl Transaction, ns: &Namespace) -> Result<Documents> {
    debug!("Scanning {ns}");
    txn.scan(ns)
}
