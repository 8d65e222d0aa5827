//! Google Cloud posture checks

use super::{CheckDefinition, CloudCheck, Collected};
use nimbus_core::{
    ClusterRecord, IpAddressRecord, OwnerMemberRecord, PublicBucketRecord, ResourceProvider,
    ResourceRecord, Result, SqlInstanceRecord, VmInstanceRecord,
};
use tracing::debug;

/// Role whose holders are reported by the owner check
pub const OWNER_ROLE: &str = "roles/owner";

/// All Google Cloud checks, in reporting order
pub fn checks() -> Vec<CloudCheck> {
    vec![
        CloudCheck::new(
            CheckDefinition::new(
                "gcp-sql-instances",
                "SQL Instances",
                "Cloud SQL",
                "Lists Cloud SQL instances with the IP addresses they expose",
            )
            .requires_api("sqladmin", "Cloud SQL"),
            collect_sql_instances,
        ),
        CloudCheck::new(
            CheckDefinition::new(
                "gcp-gke-clusters",
                "GKE clusters",
                "GKE",
                "Lists GKE clusters with their endpoint and whether they are private",
            )
            .requires_api("container", "GKE"),
            collect_clusters,
        ),
        CloudCheck::new(
            CheckDefinition::new(
                "gcp-public-buckets",
                "Buckets",
                "Cloud Storage",
                "Finds buckets whose IAM policy grants access to allUsers or allAuthenticatedUsers",
            )
            .requires_api("storage", "Storage"),
            collect_public_buckets,
        ),
        CloudCheck::new(
            CheckDefinition::new(
                "gcp-owner-members",
                "Service Accounts with roles/owner",
                "IAM",
                "Lists every principal bound to roles/owner on the project",
            )
            .requires_api("cloudresourcemanager", "CRM"),
            collect_owner_members,
        ),
        CloudCheck::new(
            CheckDefinition::new(
                "gcp-vm-instances",
                "VM Instances",
                "Compute Engine VM",
                "Lists VM instances in every zone with status and machine type",
            ),
            collect_vm_instances,
        ),
    ]
}

fn collect_sql_instances(provider: &dyn ResourceProvider) -> Result<Collected> {
    let records = provider
        .list_sql_instances()?
        .into_iter()
        .map(|inst| {
            ResourceRecord::SqlInstance(SqlInstanceRecord {
                instance: inst.name,
                region: inst.region,
                ip_addresses: inst
                    .ip_addresses
                    .into_iter()
                    .map(|ip| IpAddressRecord {
                        ip_address: ip.ip_address,
                        kind: ip.kind,
                    })
                    .collect(),
            })
        })
        .collect();

    Ok(Collected::complete(records))
}

fn collect_clusters(provider: &dyn ResourceProvider) -> Result<Collected> {
    let records = provider
        .list_clusters()?
        .into_iter()
        .map(|c| {
            ResourceRecord::Cluster(ClusterRecord {
                cluster: c.name,
                endpoint: c.endpoint,
                private_cluster_config: c.private_cluster_config.is_some(),
            })
        })
        .collect();

    Ok(Collected::complete(records))
}

fn collect_public_buckets(provider: &dyn ResourceProvider) -> Result<Collected> {
    let mut records = Vec::new();

    for bucket in provider.list_buckets()? {
        // A bucket whose policy cannot be read is left out of the report
        let policy = match provider.bucket_iam_policy(&bucket.name) {
            Ok(policy) => policy,
            Err(e) => {
                debug!("Skipping bucket {}: {}", bucket.name, e);
                continue;
            }
        };

        if let Some(binding) = policy.first_public_binding() {
            records.push(ResourceRecord::PublicBucket(PublicBucketRecord {
                bucket: bucket.name.clone(),
                role: binding.role.clone(),
                members: binding.members.clone(),
            }));
        }
    }

    Ok(Collected::complete(records))
}

fn collect_owner_members(provider: &dyn ResourceProvider) -> Result<Collected> {
    let records = provider
        .project_iam_policy()?
        .members_with_role(OWNER_ROLE)
        .into_iter()
        .map(|member| ResourceRecord::OwnerMember(OwnerMemberRecord { member }))
        .collect();

    Ok(Collected::complete(records))
}

fn collect_vm_instances(provider: &dyn ResourceProvider) -> Result<Collected> {
    let mut collected = Collected::default();

    for zone in provider.list_zones()? {
        match provider.list_instances(&zone) {
            Ok(instances) => {
                for vm in instances {
                    collected
                        .resources
                        .push(ResourceRecord::VmInstance(VmInstanceRecord {
                            machine_type: vm.machine_type_name().to_string(),
                            name: vm.name,
                            zone: zone.clone(),
                            status: vm.status,
                        }));
                }
            }
            Err(e) => collected.notes.push(format!("{}: {}", zone, e)),
        }
    }

    Ok(collected)
}
