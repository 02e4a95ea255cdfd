pub mod codec;
pub mod descriptor;
pub mod dns;
pub mod engine;
pub mod ipam;

pub use descriptor::ObjectDescriptor;
pub use engine::DescriptorResource;
pub use ipam::association::IpAssociationResource;

use dns::{nsgroups, records, shared, view, zones};

/// Every object type served by the generic engine
pub fn descriptors() -> Vec<&'static ObjectDescriptor> {
    vec![
        &zones::ZONE_AUTH,
        &zones::ZONE_FORWARD,
        &zones::ZONE_DELEGATED,
        &zones::ZONE_STUB,
        &zones::ZONE_RP,
        &view::VIEW,
        &records::RECORD_A,
        &records::RECORD_AAAA,
        &records::RECORD_CNAME,
        &records::RECORD_MX,
        &records::RECORD_PTR,
        &records::RECORD_TXT,
        &records::RECORD_SRV,
        &records::RECORD_NS,
        &records::RECORD_CAA,
        &records::RECORD_ALIAS,
        &records::RECORD_DNAME,
        &nsgroups::NSGROUP,
        &nsgroups::NSGROUP_FORWARDINGMEMBER,
        &nsgroups::NSGROUP_DELEGATION,
        &nsgroups::NSGROUP_STUBMEMBER,
        &nsgroups::NSGROUP_FORWARDSTUBSERVER,
        &shared::SHAREDRECORDGROUP,
        &shared::SHAREDRECORD_A,
        &shared::SHAREDRECORD_AAAA,
        &shared::SHAREDRECORD_CNAME,
        &shared::SHAREDRECORD_MX,
        &shared::SHAREDRECORD_SRV,
        &shared::SHAREDRECORD_TXT,
        &ipam::allocation::HOST,
    ]
}
