
use fixtures::*;
use pretty_assertions::assert_eq;
use wmi_cim::err::Result;
use wmi_cim::{CimValue, Tree, TreeNamespace};

type MemTree<'a> = Tree<&'a MemoryRepository, &'a MemoryRepository>;

fn repository() -> MemoryRepository {
    let mut repo = MemoryRepository::new().with_system_classes();
    repo.put_namespace("root", "CIMV2");
    repo.put_namespace("root", "subscription");
    repo.put_namespace("root\\CIMV2", "Security");

    repo.put_class(
        "root\\CIMV2",
        &ClassDefinitionSpec::new("CIM_Service", "")
            .property(
                PropertySpec::new("Name", TAG_STRING, 0)
                    .with_qualifier(QualifierSpec::builtin(BUILTIN_KEY, ValueSpec::Bool(true))),
            )
            .property(PropertySpec::new("Started", TAG_BOOLEAN, 1)),
    );
    repo.put_class(
        "root\\CIMV2",
        &ClassDefinitionSpec::new("Win32_Service", "CIM_Service")
            .property(PropertySpec::new("ProcessId", TAG_UINT32, 0)),
    );

    for (name, started, pid) in [("Dhcp", true, 1200u32), ("Spooler", false, 0)] {
        repo.put_instance(
            "root\\CIMV2",
            name,
            &InstanceSpec::new("Win32_Service", 5)
                .value(ValueSpec::str(name))
                .value(ValueSpec::Bool(started))
                .value(ValueSpec::U32(pid)),
        );
    }
    repo
}

fn names(namespaces: Vec<TreeNamespace<&MemoryRepository, &MemoryRepository>>) -> Vec<String> {
    namespaces.iter().map(|ns| ns.name().to_string()).collect()
}

#[test]
fn test_walks_child_namespaces() {
    ensure_env_logger_initialized();
    let repo = repository();
    let tree: MemTree = Tree::new(&repo, &repo);

    let root = tree.root();
    assert_eq!(root.name(), "root");
    assert!(root.parent().is_none());

    let children = root.namespaces().unwrap().collect::<Result<Vec<_>>>().unwrap();
    assert_eq!(names(children), vec!["root\\CIMV2", "root\\subscription"]);

    let cimv2 = root
        .namespaces()
        .unwrap()
        .find_map(|ns| ns.ok().filter(|ns| ns.name() == "root\\CIMV2"))
        .unwrap();
    let grandchildren = cimv2.namespaces().unwrap().collect::<Result<Vec<_>>>().unwrap();
    assert_eq!(names(grandchildren), vec!["root\\CIMV2\\Security"]);
    assert_eq!(cimv2.parent().unwrap().name(), "root");
    assert_eq!(cimv2.to_string(), "Namespace(name: root\\CIMV2)");
}

#[test]
fn test_lists_classes_and_instances() {
    ensure_env_logger_initialized();
    let repo = repository();
    let tree: MemTree = Tree::new(&repo, &repo);
    let cimv2 = tree.root().class("Win32_Service").namespace();
    assert_eq!(cimv2.name(), "root");

    let cimv2 = tree
        .root()
        .namespaces()
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    let classes = cimv2.classes().unwrap().collect::<Result<Vec<_>>>().unwrap();
    let class_names: Vec<&str> = classes.iter().map(|c| c.name()).collect();
    assert_eq!(class_names, vec!["CIM_Service", "Win32_Service"]);

    let service = &classes[1];
    assert_eq!(
        service.to_string(),
        "ClassDefinition(namespace: root\\CIMV2, name: Win32_Service)"
    );
    assert_eq!(service.definition().unwrap().super_class_name(), "CIM_Service");
    assert_eq!(service.layout().unwrap().properties().len(), 3);

    let instances = service.instances().unwrap().collect::<Result<Vec<_>>>().unwrap();
    let instance_names: Vec<&str> = instances.iter().map(|i| i.name()).collect();
    assert_eq!(instance_names, vec!["Dhcp", "Spooler"]);
    assert_eq!(
        instances[0].to_string(),
        "ClassInstance(namespace: root\\CIMV2, class: Win32_Service, name: Dhcp)"
    );
}

#[test]
fn test_instance_node_decodes_record() {
    ensure_env_logger_initialized();
    let repo = repository();
    let tree: MemTree = Tree::new(&repo, &repo);
    let cimv2 = tree.root().namespaces().unwrap().next().unwrap().unwrap();
    let service = cimv2.class("Win32_Service");

    let spooler = service
        .instances()
        .unwrap()
        .map(|i| i.unwrap())
        .find(|i| i.name() == "Spooler")
        .unwrap();
    assert_eq!(spooler.class_definition().name(), "Win32_Service");
    assert_eq!(spooler.namespace().name(), "root\\CIMV2");

    let decoded = spooler.instance().unwrap();
    assert_eq!(decoded.class_name().unwrap(), "Win32_Service");
    assert_eq!(
        decoded.get_property_value("Started").unwrap(),
        Some(CimValue::Boolean(false))
    );
    assert_eq!(
        decoded.get_property_value("ProcessId").unwrap(),
        Some(CimValue::UInt32(0))
    );
}

#[test]
fn test_empty_namespace_has_no_children() {
    ensure_env_logger_initialized();
    let repo = repository();
    let tree: MemTree = Tree::new(&repo, &repo);
    let subscription = tree
        .root()
        .namespaces()
        .unwrap()
        .map(|ns| ns.unwrap())
        .find(|ns| ns.name().ends_with("subscription"))
        .unwrap();
    assert_eq!(subscription.namespaces().unwrap().count(), 0);
    assert_eq!(subscription.classes().unwrap().count(), 0);
}
