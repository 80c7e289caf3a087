
use fixtures::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use wmi_cim::err::{CimError, DeserializationError};
use wmi_cim::{CimValue, ObjectResolver, ResolverSettings};

const NS: &str = "root\\CIMV2";

fn repository(marker: u32, unk1: u32) -> MemoryRepository {
    let mut repo = MemoryRepository::new().with_system_classes();
    repo.put_class(
        NS,
        &ClassDefinitionSpec::new("Win32_LogicalDisk", "")
            .marker(marker, unk1)
            .qualifier(QualifierSpec::named("provider", ValueSpec::str("CIMWin32")))
            .property(
                PropertySpec::new("DeviceID", TAG_STRING, 0)
                    .with_qualifier(QualifierSpec::builtin(BUILTIN_KEY, ValueSpec::Bool(true)))
                    .with_qualifier(QualifierSpec::builtin(BUILTIN_READ_ACCESS, ValueSpec::U32(1))),
            )
            .property(PropertySpec::new("Size", TAG_UINT64, 1))
            .property(PropertySpec::new("InstallDate", TAG_DATETIME, 2))
            .property(PropertySpec::array("Capabilities", TAG_UINT32, 3))
            .property(PropertySpec::array("Aliases", TAG_STRING, 4)),
    );
    repo
}

fn disk(padding: usize, device: &str, size: u64) -> InstanceSpec {
    InstanceSpec::new("Win32_LogicalDisk", padding)
        .value(ValueSpec::str(device))
        .value(ValueSpec::U64(size))
        .value(ValueSpec::DateTime("20200102030405.000000+060".to_string()))
        .value(ValueSpec::U32Array(vec![3, 7]))
        .value(ValueSpec::NullArray(TAG_STRING))
}

#[test]
fn test_padding_search_through_resolver() {
    ensure_env_logger_initialized();
    let mut repo = repository(0x17, 2);
    repo.put_instance(NS, "C:", &disk(7, "C:", 1 << 40));
    repo.put_instance(NS, "D:", &disk(8, "D:", 512));
    let resolver = ObjectResolver::new(&repo, &repo);

    let c = resolver.class_instance(NS, "Win32_LogicalDisk", "C:").unwrap();
    assert_eq!(c.padding_length(), 7);
    assert_eq!(c.get_property_value("Size").unwrap(), Some(CimValue::UInt64(1 << 40)));

    let d = resolver.class_instance(NS, "Win32_LogicalDisk", "D:").unwrap();
    assert_eq!(d.padding_length(), 8);
    assert_eq!(
        d.get_property_value("DeviceID").unwrap(),
        Some(CimValue::String("D:".to_string()))
    );
}

#[test]
fn test_unrecoverable_padding_names_the_instance() {
    ensure_env_logger_initialized();
    let mut repo = repository(0x17, 2);
    let mut buf = disk(7, "C:", 1).build();
    buf.extend_from_slice(&[0, 0]);
    repo.put_raw(
        format!(
            "NS_{}/CI_{}/IL_{}",
            name_hash(NS),
            name_hash("Win32_LogicalDisk"),
            name_hash("C:")
        ),
        buf,
    );
    let resolver = ObjectResolver::new(&repo, &repo);

    match resolver.class_instance(NS, "Win32_LogicalDisk", "C:") {
        Err(CimError::FailedToDecodeInstance {
            namespace,
            class,
            source: DeserializationError::PaddingRecoveryFailed { base, .. },
            ..
        }) => {
            assert_eq!(namespace, NS);
            assert_eq!(class, "Win32_LogicalDisk");
            assert_eq!(base, 2);
        }
        other => panic!("expected padding failure, got {other:?}"),
    }

    // The class itself stays usable.
    assert_eq!(
        resolver
            .class_layout(NS, "Win32_LogicalDisk")
            .unwrap()
            .properties()
            .len(),
        5
    );
}

#[test]
fn test_instance_values_and_qualifiers() {
    ensure_env_logger_initialized();
    let mut repo = repository(0x19, 0);
    repo.put_instance(
        NS,
        "C:",
        &disk(5, "C:", 100).qualifier(QualifierSpec::named("dynamic", ValueSpec::Bool(true))),
    );
    let resolver = ObjectResolver::new(&repo, &repo);
    let instance = resolver.class_instance(NS, "Win32_LogicalDisk", "C:").unwrap();

    assert_eq!(instance.class_name().unwrap(), "Win32_LogicalDisk");
    assert_eq!(instance.qualifiers().get("dynamic"), Some(&CimValue::Boolean(true)));

    let (property, value) = instance.property("DeviceID").unwrap().unwrap();
    assert!(property.is_key());
    assert_eq!(property.qualifiers().get("read-access"), Some(&CimValue::UInt32(1)));
    assert_eq!(value, CimValue::String("C:".to_string()));

    assert_eq!(
        instance.to_json().unwrap(),
        json!({
            "DeviceID": "C:",
            "Size": 100,
            "InstallDate": "20200102030405.000000+060",
            "Capabilities": [3, 7],
            "Aliases": [],
        })
    );
    assert_eq!(instance.key().unwrap(), Some("C:".to_string()));
}

#[test]
fn test_class_definition_json() {
    ensure_env_logger_initialized();
    let repo = repository(0x19, 0);
    let resolver = ObjectResolver::new(&repo, &repo);
    let cd = resolver.class_definition(NS, "Win32_LogicalDisk").unwrap();

    let rendered = cd.to_json();
    assert_eq!(rendered["name"], "Win32_LogicalDisk");
    assert_eq!(rendered["qualifiers"], json!({"provider": "CIMWin32"}));
    assert_eq!(rendered["properties"][3]["type"], "arrayref to UINT32");
    assert_eq!(
        rendered["properties"][0]["qualifiers"],
        json!({"key": true, "read-access": 1})
    );
}

#[test]
fn test_bulk_decode_matches_single_decodes() {
    ensure_env_logger_initialized();
    let mut repo = repository(0x17, 1);
    let letters = ["C:", "D:", "E:", "F:", "G:", "H:"];
    for (i, letter) in letters.iter().enumerate() {
        // Alternate between both padding candidates.
        repo.put_instance(NS, letter, &disk(6 + i % 2, letter, i as u64));
    }

    let resolver =
        ObjectResolver::with_settings(&repo, &repo, ResolverSettings::new().num_threads(2));
    let bulk = resolver.class_instances(NS, "Win32_LogicalDisk").unwrap();
    assert_eq!(bulk.len(), letters.len());

    for (i, instance) in bulk.iter().enumerate() {
        let single = resolver
            .class_instance(NS, "Win32_LogicalDisk", letters[i])
            .unwrap();
        assert_eq!(instance.to_json().unwrap(), single.to_json().unwrap());
        assert_eq!(instance.padding_length(), 6 + i % 2);
    }
}

#[test]
fn test_dynamic_instance_is_rejected() {
    ensure_env_logger_initialized();
    let mut repo = repository(0x19, 0);
    repo.put_instance(NS, "Z:", &disk(5, "Z:", 0).flag(0));
    let resolver = ObjectResolver::new(&repo, &repo);

    assert!(matches!(
        resolver.class_instance(NS, "Win32_LogicalDisk", "Z:"),
        Err(CimError::FailedToDecodeInstance {
            source: DeserializationError::UnsupportedInstanceVariant { value: 0, .. },
            ..
        })
    ));
}
