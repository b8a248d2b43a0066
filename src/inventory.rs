//! One listing inquiry: invoke the tool, parse its stdout, filter by owner.

use crate::config::Config;
use crate::error::ScanError;
use crate::invoke::{self, CapturedOutput, InvocationRequest};
use crate::listing::{self, HeadingTable, VmDetails, VmRecord};
use crate::ownership;

/// Parsed result of a completed listing call.
#[derive(Debug, Clone)]
pub struct Listing {
    pub output: CapturedOutput,
    pub records: Vec<VmRecord>,
    headings: HeadingTable,
}

impl Listing {
    pub fn names(&self) -> Vec<String> {
        ownership::filter_owned(&self.records, "")
    }

    pub fn owned(&self, prefix: &str) -> Vec<String> {
        ownership::filter_owned(&self.records, prefix)
    }

    /// Records with their detail fields, re-read from the captured stdout.
    pub fn details(&self) -> Vec<VmDetails> {
        listing::parse_detailed(&self.output.stdout, &self.headings)
    }

    /// Fail with [`ScanError::ToolFailed`] unless the tool exited with 0.
    pub fn require_success(&self, request: &InvocationRequest) -> Result<(), ScanError> {
        self.output.require_success(request)
    }
}

/// Invoke `request` and parse its stdout. Launch failures and timeouts are
/// errors; a non-zero exit is not, and the output is parsed regardless.
pub async fn list(request: &InvocationRequest, headings: &HeadingTable) -> Result<Listing, ScanError> {
    let output = invoke::invoke(request).await.into_result(request)?;
    if !output.success() {
        tracing::warn!(
            program = %request.program().display(),
            status = %output.status_label(),
            stderr = %output.stderr.trim(),
            "listing exited unsuccessfully"
        );
    }
    let records = listing::parse_with(&output.stdout, headings);
    tracing::info!(count = records.len(), "parsed VM listing");
    Ok(Listing {
        output,
        records,
        headings: headings.clone(),
    })
}

/// Names of the VMs owned by this system, per `config`.
pub async fn owned_vms(config: &Config) -> Result<Vec<String>, ScanError> {
    let request = config.listing_request()?;
    let listing = list(&request, &config.headings()).await?;
    Ok(listing.owned(&config.prefix))
}
