use crate::listing::{VmDetails, VmRecord};

/// Prefix carried by every VM this system creates.
pub const DEFAULT_PREFIX: &str = "vortex-";

/// Names of `records` that start with `prefix`, in input order.
///
/// Exact, case-sensitive prefix match. An empty prefix keeps everything.
pub fn filter_owned(records: &[VmRecord], prefix: &str) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.name.starts_with(prefix))
        .map(|r| r.name.clone())
        .collect()
}

/// Detailed records whose name starts with `prefix`, in input order.
pub fn filter_owned_details(vms: Vec<VmDetails>, prefix: &str) -> Vec<VmDetails> {
    vms.into_iter()
        .filter(|vm| vm.name.starts_with(prefix))
        .collect()
}
