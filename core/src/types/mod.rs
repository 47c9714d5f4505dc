pub mod ecosystem;
pub mod record;
pub mod severity;

pub use ecosystem::Ecosystem;
pub use record::{
    truncate_description, CveRecord, PackageAdvisory, Remediation, DESCRIPTION_LIMIT, ELLIPSIS,
    MAX_AFFECTED_PACKAGES, MAX_BULK_AFFECTED_PACKAGES, MAX_FIXED_VERSIONS, MAX_REFERENCES,
};
pub use severity::Severity;
