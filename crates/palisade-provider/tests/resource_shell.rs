//! Resource shell flows against the fake device: create/read/update/
//! delete/import for singleton and grouping resources, plus mode and
//! location enforcement.

mod common;

use common::FakeDeviceClient;
use palisade_core::client::DeviceClient;
use palisade_core::location::{Location, LocationModel, VsysModel};
use palisade_core::tfid::{self, ResourceIdentity};
use palisade_core::xmlapi::BatchOp;
use palisade_provider::Provider;
use palisade_provider::resources::address::AddressModel;
use palisade_provider::resources::security_policy::{SecurityPolicyModel, SecurityRuleModel};
use palisade_provider::resources::template_variable::TemplateVariableModel;
use palisade_provider::resources::{ManagedResource, ResourceError};

const ADDRESS_COLLECTION: &str = "/config/shared/address";
const RULES_COLLECTION: &str = "/config/shared/rulebase/security/rules";

fn shared_location() -> LocationModel {
    LocationModel {
        shared: Some(true),
        ..LocationModel::default()
    }
}

fn address(name: &str, cidr: &str) -> AddressModel {
    AddressModel {
        location: shared_location(),
        name: name.to_string(),
        ip_netmask: Some(cidr.to_string()),
        ..AddressModel::default()
    }
}

#[tokio::test]
async fn test_address_create_read_delete() {
    let client = FakeDeviceClient::new();
    let provider = Provider::with_client(client.clone());

    let created = AddressModel::create(&provider, address("web-1", "10.1.0.1/32"))
        .await
        .expect("create");
    assert_eq!(client.entry_names(ADDRESS_COLLECTION), vec!["web-1"]);

    // The tfid decodes back to the object's identity.
    let identity = tfid::decode(created.tfid.as_deref().expect("tfid")).expect("decode");
    assert_eq!(identity.name.as_deref(), Some("web-1"));
    assert!(matches!(identity.location, Location::Shared(true)));

    let read = AddressModel::read(&provider, created.clone())
        .await
        .expect("read")
        .expect("present");
    assert_eq!(read.ip_netmask.as_deref(), Some("10.1.0.1/32"));

    AddressModel::delete(&provider, created).await.expect("delete");
    assert!(client.entry_names(ADDRESS_COLLECTION).is_empty());
}

#[tokio::test]
async fn test_address_create_conflicts_with_existing() {
    let client = FakeDeviceClient::new();
    let provider = Provider::with_client(client.clone());

    AddressModel::create(&provider, address("web-1", "10.1.0.1/32"))
        .await
        .expect("first create");
    let err = AddressModel::create(&provider, address("web-1", "10.9.9.9/32"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("already exists"));
}

#[tokio::test]
async fn test_address_read_of_vanished_object_clears_state() {
    let client = FakeDeviceClient::new();
    let provider = Provider::with_client(client.clone());

    let created = AddressModel::create(&provider, address("web-1", "10.1.0.1/32"))
        .await
        .expect("create");

    // Someone deletes it out from under the orchestrator.
    client
        .delete(&format!("{ADDRESS_COLLECTION}/entry[@name='web-1']"))
        .await
        .expect("external delete");

    let outcome = AddressModel::read(&provider, created).await.expect("read");
    assert!(outcome.is_none(), "absent object must clear state");
}

#[tokio::test]
async fn test_address_update_renames_implicitly() {
    let client = FakeDeviceClient::new();
    let provider = Provider::with_client(client.clone());

    let state = AddressModel::create(&provider, address("old-name", "10.1.0.1/32"))
        .await
        .expect("create");
    let planned = address("new-name", "10.1.0.1/32");

    let updated = AddressModel::update(&provider, state, planned)
        .await
        .expect("update");
    assert_eq!(updated.name, "new-name");
    assert_eq!(client.entry_names(ADDRESS_COLLECTION), vec!["new-name"]);

    let identity = tfid::decode(updated.tfid.as_deref().expect("tfid")).expect("decode");
    assert_eq!(identity.name.as_deref(), Some("new-name"));
}

#[tokio::test]
async fn test_address_import_then_read() {
    let client = FakeDeviceClient::new();
    let provider = Provider::with_client(client.clone());

    AddressModel::create(&provider, address("web-1", "10.1.0.1/32"))
        .await
        .expect("create");

    let id = tfid::encode(&ResourceIdentity::singleton(
        "web-1",
        Location::Shared(true),
    ))
    .expect("encode");

    let seeded = AddressModel::import(&provider, &id).await.expect("import");
    assert_eq!(seeded.name, "web-1");
    assert_eq!(seeded.ip_netmask, None, "import seeds identity only");

    let read = AddressModel::read(&provider, seeded)
        .await
        .expect("read")
        .expect("present");
    assert_eq!(read.ip_netmask.as_deref(), Some("10.1.0.1/32"));
}

#[tokio::test]
async fn test_import_rejects_garbage_ids() {
    let provider = Provider::inspection(None);
    let err = AddressModel::import(&provider, "!!! not a tfid !!!")
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::Tfid(_)));
}

#[tokio::test]
async fn test_mutations_refused_in_inspection_mode() {
    let provider = Provider::inspection(None);
    let err = AddressModel::create(&provider, address("web-1", "10.1.0.1/32"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::InvalidMode));
}

#[tokio::test]
async fn test_location_restriction_enforced() {
    let client = FakeDeviceClient::new();
    let provider = Provider::with_client(client);

    // Template variables only live in templates; a vsys location must
    // be rejected before any device traffic.
    let model = TemplateVariableModel {
        location: LocationModel {
            vsys: Some(VsysModel::default()),
            ..LocationModel::default()
        },
        name: "$mgmt-ip".to_string(),
        ip_netmask: Some("10.0.0.5/32".to_string()),
        ..TemplateVariableModel::default()
    };
    let err = TemplateVariableModel::create(&provider, model)
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::Location(_)));
}

fn rule(name: &str, app: &str) -> SecurityRuleModel {
    SecurityRuleModel {
        name: name.to_string(),
        applications: Some(vec![app.to_string()]),
        action: Some("allow".to_string()),
        ..SecurityRuleModel::default()
    }
}

#[tokio::test]
async fn test_security_policy_create_then_rename_rule() {
    let client = FakeDeviceClient::new();
    let provider = Provider::with_client(client.clone());

    let state = SecurityPolicyModel::create(
        &provider,
        SecurityPolicyModel {
            location: shared_location(),
            rules: vec![rule("allow-dns", "dns"), rule("allow-web", "web-browsing")],
            tfid: None,
        },
    )
    .await
    .expect("create");
    assert_eq!(
        client.entry_names(RULES_COLLECTION),
        vec!["allow-dns", "allow-web"]
    );

    // Rename-only change: allow-web becomes allow-http.
    let planned = SecurityPolicyModel {
        location: shared_location(),
        rules: vec![rule("allow-dns", "dns"), rule("allow-http", "web-browsing")],
        tfid: None,
    };
    let updated = SecurityPolicyModel::update(&provider, state, planned)
        .await
        .expect("update");
    assert_eq!(
        client.entry_names(RULES_COLLECTION),
        vec!["allow-dns", "allow-http"]
    );

    // The second batch is exactly one rename: identity is preserved
    // rather than delete+create.
    let batches = client.batches.lock().unwrap();
    let last = batches.last().expect("batch recorded");
    assert_eq!(last.len(), 1);
    assert!(matches!(&last[0], BatchOp::Rename { new_name, .. } if new_name == "allow-http"));
    drop(batches);

    let identity = tfid::decode(updated.tfid.as_deref().expect("tfid")).expect("decode");
    assert_eq!(
        identity.names,
        Some(vec!["allow-dns".to_string(), "allow-http".to_string()])
    );
}

#[tokio::test]
async fn test_security_policy_read_drops_vanished_rules() {
    let client = FakeDeviceClient::new();
    let provider = Provider::with_client(client.clone());

    let state = SecurityPolicyModel::create(
        &provider,
        SecurityPolicyModel {
            location: shared_location(),
            rules: vec![rule("keep", "dns"), rule("gone", "ssh")],
            tfid: None,
        },
    )
    .await
    .expect("create");

    client
        .delete(&format!("{RULES_COLLECTION}/entry[@name='gone']"))
        .await
        .expect("external delete");

    let read = SecurityPolicyModel::read(&provider, state)
        .await
        .expect("read")
        .expect("still present");
    assert_eq!(read.rules.len(), 1);
    assert_eq!(read.rules[0].name, "keep");
}

#[tokio::test]
async fn test_security_policy_delete_removes_owned_rules() {
    let client = FakeDeviceClient::new();
    let provider = Provider::with_client(client.clone());

    let state = SecurityPolicyModel::create(
        &provider,
        SecurityPolicyModel {
            location: shared_location(),
            rules: vec![rule("r1", "dns"), rule("r2", "ssh")],
            tfid: None,
        },
    )
    .await
    .expect("create");

    SecurityPolicyModel::delete(&provider, state)
        .await
        .expect("delete");
    assert!(client.entry_names(RULES_COLLECTION).is_empty());
}

#[tokio::test]
async fn test_bulk_addresses_update_renames_instead_of_recreating() {
    use palisade_provider::resources::addresses::AddressesModel;

    let client = FakeDeviceClient::new();
    let provider = Provider::with_client(client.clone());

    let state = AddressesModel::create(
        &provider,
        AddressesModel {
            location: shared_location(),
            addresses: vec![
                address("web-1", "10.1.0.1/32"),
                address("web-2", "10.1.0.2/32"),
            ],
            tfid: None,
        },
    )
    .await
    .expect("create");
    assert_eq!(
        client.entry_names(ADDRESS_COLLECTION),
        vec!["web-1", "web-2"]
    );

    // web-2 is renamed; content unchanged.
    let planned = AddressesModel {
        location: shared_location(),
        addresses: vec![
            address("web-1", "10.1.0.1/32"),
            address("web-backend", "10.1.0.2/32"),
        ],
        tfid: None,
    };
    let updated = AddressesModel::update(&provider, state, planned)
        .await
        .expect("update");
    assert_eq!(
        client.entry_names(ADDRESS_COLLECTION),
        vec!["web-1", "web-backend"]
    );

    let batches = client.batches.lock().unwrap();
    let last = batches.last().expect("batch recorded");
    assert_eq!(last.len(), 1);
    assert!(matches!(&last[0], BatchOp::Rename { new_name, .. } if new_name == "web-backend"));
    drop(batches);

    let identity = tfid::decode(updated.tfid.as_deref().expect("tfid")).expect("decode");
    assert_eq!(
        identity.names,
        Some(vec!["web-1".to_string(), "web-backend".to_string()])
    );
}

#[tokio::test]
async fn test_external_list_create_and_read() {
    use palisade_provider::resources::external_list::{EdlKind, EdlModel, Recurring};

    let client = FakeDeviceClient::new();
    let provider = Provider::with_client(client.clone());

    let created = EdlModel::create(
        &provider,
        EdlModel {
            location: shared_location(),
            name: "botnet-ips".to_string(),
            kind: Some(EdlKind::Ip),
            url: Some("https://feeds.example.com/botnet.txt".to_string()),
            recurring: Some(Recurring::Hourly),
            ..EdlModel::default()
        },
    )
    .await
    .expect("create");
    assert_eq!(
        client.entry_names("/config/shared/external-list"),
        vec!["botnet-ips"]
    );

    let read = EdlModel::read(&provider, created)
        .await
        .expect("read")
        .expect("present");
    assert_eq!(read.kind, Some(EdlKind::Ip));
    assert_eq!(read.recurring, Some(Recurring::Hourly));
}

#[tokio::test]
async fn test_zone_rejects_shared_location_in_shell() {
    use palisade_provider::resources::zone::{ZoneModel, ZoneMode};

    let client = FakeDeviceClient::new();
    let provider = Provider::with_client(client.clone());

    // Zones are vsys-scoped; a shared location must fail before any
    // device traffic.
    let err = ZoneModel::create(
        &provider,
        ZoneModel {
            location: shared_location(),
            name: "trust".to_string(),
            mode: Some(ZoneMode::Layer3),
            ..ZoneModel::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ResourceError::Location(_)));

    let created = ZoneModel::create(
        &provider,
        ZoneModel {
            location: LocationModel {
                vsys: Some(VsysModel::default()),
                ..LocationModel::default()
            },
            name: "trust".to_string(),
            mode: Some(ZoneMode::Layer3),
            interfaces: Some(vec!["ethernet1/1".to_string()]),
            ..ZoneModel::default()
        },
    )
    .await
    .expect("create in vsys");
    assert_eq!(created.interfaces, Some(vec!["ethernet1/1".to_string()]));
    assert_eq!(
        client.entry_names(
            "/config/devices/entry[@name='localhost.localdomain']\
             /vsys/entry[@name='vsys1']/zone"
        ),
        vec!["trust"]
    );
}

#[tokio::test]
async fn test_security_policy_group_import() {
    let provider = Provider::inspection(None);
    let id = tfid::encode(&ResourceIdentity::group(
        vec!["r1".to_string(), "r2".to_string()],
        Location::Shared(true),
    ))
    .expect("encode");

    let seeded = SecurityPolicyModel::import(&provider, &id)
        .await
        .expect("import");
    let names: Vec<&str> = seeded.rules.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["r1", "r2"]);
    assert_eq!(seeded.tfid.as_deref(), Some(id.as_str()));
}
