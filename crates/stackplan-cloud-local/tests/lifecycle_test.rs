use serde_json::json;
use stackplan_cloud::{ActionType, CloudError, CloudProvider, ResourceStatus, resolve_outputs};
use stackplan_cloud_local::LocalProvider;
use stackplan_core::{
    Input, Ipv4Cidr, ResourceGraph, ResourceKey, ResourceKind, StackParams, declare_stack,
};
use tempfile::TempDir;

fn provider() -> (TempDir, LocalProvider) {
    let dir = tempfile::tempdir().unwrap();
    let provider = LocalProvider::new(dir.path(), "us-east-1");
    (dir, provider)
}

fn key(kind: ResourceKind, name: &str) -> ResourceKey {
    ResourceKey::new(kind, name)
}

async fn up(provider: &LocalProvider, graph: &ResourceGraph) {
    let plan = provider.plan(graph).await.unwrap();
    let result = provider.apply(graph, &plan).await.unwrap();
    assert!(result.is_success(), "apply failed: {:?}", result.failed);
}

#[tokio::test]
async fn test_apply_records_every_resource() {
    let (_dir, provider) = provider();
    let graph = declare_stack(&StackParams::default()).unwrap();

    let plan = provider.plan(&graph).await.unwrap();
    assert_eq!(plan.summary().create, graph.len());

    let result = provider.apply(&graph, &plan).await.unwrap();
    assert!(result.is_success());
    assert_eq!(result.succeeded.len(), graph.len());

    let state = provider.get_state().await.unwrap();
    assert_eq!(state.len(), graph.len());
    assert!(
        state
            .iter()
            .all(|(_, r)| r.status == ResourceStatus::Running)
    );

    let vpc = state.get(&key(ResourceKind::Network, "mongo-vpc")).unwrap();
    assert!(vpc.id.starts_with("vpc-"));
    assert_eq!(
        vpc.attributes["arn"],
        json!(format!(
            "arn:aws:ec2:us-east-1:000000000000:network/{}",
            vpc.id
        ))
    );
}

#[tokio::test]
async fn test_references_resolve_to_applied_ids() {
    let (_dir, provider) = provider();
    let graph = declare_stack(&StackParams::default()).unwrap();
    up(&provider, &graph).await;

    let state = provider.get_state().await.unwrap();
    let public_1 = state
        .get(&key(ResourceKind::Subnet, "mongo-vpc-public-1"))
        .unwrap();
    let public_2 = state
        .get(&key(ResourceKind::Subnet, "mongo-vpc-public-2"))
        .unwrap();
    let efs = state.get(&key(ResourceKind::FileSystem, "mongo-efs")).unwrap();

    let mt1 = state
        .get(&key(ResourceKind::MountTarget, "mongo-publicMountTarget-1"))
        .unwrap();
    let mt2 = state
        .get(&key(ResourceKind::MountTarget, "mongo-publicMountTarget-2"))
        .unwrap();
    assert_eq!(mt1.attributes["subnet_id"], json!(public_1.id));
    assert_eq!(mt2.attributes["subnet_id"], json!(public_2.id));
    assert_eq!(mt1.attributes["file_system_id"], json!(efs.id));
    assert_eq!(mt1.attributes["ip_address"], json!("10.0.0.4"));
    assert_eq!(mt2.attributes["ip_address"], json!("10.0.32.4"));

    let service = state.get(&key(ResourceKind::Service, "mongo")).unwrap();
    assert_eq!(
        service.inputs["task_definition"]["volumes"][0]["efs_volume_configuration"]
            ["file_system_id"],
        json!(efs.id)
    );
    assert_eq!(
        service.inputs["subnets"],
        json!([public_1.id.clone(), public_2.id.clone()])
    );
}

#[tokio::test]
async fn test_replan_after_apply_has_no_changes() {
    let (_dir, provider) = provider();
    let graph = declare_stack(&StackParams::default()).unwrap();
    up(&provider, &graph).await;

    let plan = provider.plan(&graph).await.unwrap();
    assert!(!plan.has_changes);
    assert_eq!(plan.summary().no_change, graph.len());
}

#[tokio::test]
async fn test_replica_change_updates_service_only() {
    let (_dir, provider) = provider();
    let graph = declare_stack(&StackParams::default()).unwrap();
    up(&provider, &graph).await;
    let before = provider.get_state().await.unwrap();

    let changed = declare_stack(&StackParams {
        desired_count: 3,
        ..StackParams::default()
    })
    .unwrap();
    let plan = provider.plan(&changed).await.unwrap();
    let updates = plan.actions_by_type(ActionType::Update);
    assert_eq!(plan.summary().update, 1);
    assert_eq!(plan.summary().create, 0);
    assert_eq!(updates[0].key, key(ResourceKind::Service, "mongo"));

    let result = provider.apply(&changed, &plan).await.unwrap();
    assert!(result.is_success());

    let after = provider.get_state().await.unwrap();
    let service_key = key(ResourceKind::Service, "mongo");
    let old = before.get(&service_key).unwrap();
    let new = after.get(&service_key).unwrap();
    assert_eq!(new.id, old.id);
    assert_eq!(new.attributes["arn"], old.attributes["arn"]);
    assert_eq!(new.attributes["desired_count"], json!(3));

    assert!(!provider.plan(&changed).await.unwrap().has_changes);
}

#[tokio::test]
async fn test_outputs_after_apply() {
    let (_dir, provider) = provider();
    let graph = declare_stack(&StackParams::default()).unwrap();

    let outputs = resolve_outputs(&graph, &provider.get_state().await.unwrap());
    assert!(outputs.values().all(|o| !o.complete));

    up(&provider, &graph).await;
    let state = provider.get_state().await.unwrap();
    let outputs = resolve_outputs(&graph, &state);
    assert!(outputs.values().all(|o| o.complete));

    let url = outputs["url"].value.as_str().unwrap();
    assert!(url.starts_with("mongo-service-"));
    assert!(url.ends_with(".elb.us-east-1.amazonaws.com"));

    let vpc = state.get(&key(ResourceKind::Network, "mongo-vpc")).unwrap();
    assert_eq!(outputs["vpc_id"].value, json!(vpc.id));
    assert_eq!(
        outputs["vpc_public_subnet_ids"].value.as_array().unwrap().len(),
        2
    );
    assert_eq!(
        outputs["public_subnet_1"].value,
        outputs["vpc_public_subnet_ids"].value[0]
    );
}

#[tokio::test]
async fn test_failure_skips_dependents() {
    let (_dir, provider) = provider();
    let mut graph = ResourceGraph::new();
    let fs = graph
        .declare(ResourceKind::FileSystem, "data", [("tags", Input::from(json!({})))])
        .unwrap();
    let mt = graph
        .declare(
            ResourceKind::MountTarget,
            "data-mt",
            [
                ("file_system_id", fs.id()),
                ("subnet_id", Input::from("subnet-missing")),
            ],
        )
        .unwrap();
    graph
        .declare(
            ResourceKind::Cluster,
            "c",
            [("mount_target_id", mt.id())],
        )
        .unwrap();

    let plan = provider.plan(&graph).await.unwrap();
    let result = provider.apply(&graph, &plan).await.unwrap();

    assert!(!result.is_success());
    assert_eq!(result.succeeded.len(), 1);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].action_id, "create-mount-target:data-mt");
    assert_eq!(result.skipped, vec!["create-cluster:c".to_string()]);

    // the successful part is kept
    let state = provider.get_state().await.unwrap();
    assert_eq!(state.len(), 1);
    assert!(state.contains(&fs));
}

#[tokio::test]
async fn test_destroy_refuses_while_referenced() {
    let (_dir, provider) = provider();
    let graph = declare_stack(&StackParams::default()).unwrap();
    up(&provider, &graph).await;

    let vpc = key(ResourceKind::Network, "mongo-vpc");
    assert!(matches!(
        provider.destroy(&vpc).await,
        Err(CloudError::DependencyViolation { .. })
    ));

    let service = key(ResourceKind::Service, "mongo");
    provider.destroy(&service).await.unwrap();
    assert!(!provider.get_state().await.unwrap().contains(&service));

    assert!(matches!(
        provider.destroy(&service).await,
        Err(CloudError::ResourceNotFound(_))
    ));
}

#[tokio::test]
async fn test_destroy_all() {
    let (dir, provider) = provider();
    let graph = declare_stack(&StackParams::default()).unwrap();
    up(&provider, &graph).await;

    let result = provider.destroy_all().await.unwrap();
    assert!(result.is_success());
    assert_eq!(result.succeeded.len(), graph.len());
    assert!(provider.get_state().await.unwrap().is_empty());
    assert!(!dir.path().join(".stackplan/lock.json").exists());

    let plan = provider.plan(&graph).await.unwrap();
    assert_eq!(plan.summary().create, graph.len());
}

#[tokio::test]
async fn test_removed_resource_is_deleted() {
    let (_dir, provider) = provider();
    let mut graph = ResourceGraph::new();
    graph
        .declare(ResourceKind::Cluster, "a", [("name", Input::from("a"))])
        .unwrap();
    graph
        .declare(ResourceKind::Cluster, "b", [("name", Input::from("b"))])
        .unwrap();
    up(&provider, &graph).await;

    let mut smaller = ResourceGraph::new();
    smaller
        .declare(ResourceKind::Cluster, "a", [("name", Input::from("a"))])
        .unwrap();
    let plan = provider.plan(&smaller).await.unwrap();
    assert_eq!(plan.summary().delete, 1);
    assert_eq!(plan.summary().no_change, 1);

    provider.apply(&smaller, &plan).await.unwrap();
    let state = provider.get_state().await.unwrap();
    assert_eq!(state.keys(), vec![key(ResourceKind::Cluster, "a")]);
}

#[tokio::test]
async fn test_check_auth() {
    let (_dir, provider) = provider();
    let auth = provider.check_auth().await.unwrap();
    assert!(auth.authenticated);
    assert_eq!(provider.name(), "local");
    assert_eq!(provider.region(), "us-east-1");
}

#[tokio::test]
async fn test_check_auth_fails_when_state_dir_is_a_file() {
    let (dir, provider) = provider();
    std::fs::write(dir.path().join(".stackplan"), "").unwrap();

    let auth = provider.check_auth().await.unwrap();
    assert!(!auth.authenticated);
    assert!(auth.error.unwrap().contains("is not a directory"));
}

#[tokio::test]
async fn test_network_cidr_change_moves_mount_targets() {
    let (_dir, provider) = provider();
    let graph = declare_stack(&StackParams::default()).unwrap();
    up(&provider, &graph).await;
    let before = provider.get_state().await.unwrap();

    let changed = declare_stack(&StackParams {
        network_cidr: "172.16.0.0/16".parse().unwrap(),
        ..StackParams::default()
    })
    .unwrap();
    let plan = provider.plan(&changed).await.unwrap();
    assert_eq!(plan.summary().create, 0);
    assert_eq!(plan.summary().update, 5);

    let result = provider.apply(&changed, &plan).await.unwrap();
    assert!(result.is_success(), "apply failed: {:?}", result.failed);

    let state = provider.get_state().await.unwrap();
    for (n, ip) in [(1, "172.16.0.4"), (2, "172.16.32.4")] {
        let subnet = state
            .get(&key(ResourceKind::Subnet, &format!("mongo-vpc-public-{}", n)))
            .unwrap();
        let block: Ipv4Cidr = subnet
            .get_attribute::<String>("cidr_block")
            .unwrap()
            .parse()
            .unwrap();

        let mt_key = key(ResourceKind::MountTarget, &format!("mongo-publicMountTarget-{}", n));
        let mt = state.get(&mt_key).unwrap();
        let address: std::net::Ipv4Addr = mt
            .get_attribute::<String>("ip_address")
            .unwrap()
            .parse()
            .unwrap();
        assert!(block.contains_addr(address), "{} outside {}", address, block);
        assert_eq!(mt.attributes["ip_address"], json!(ip));
        assert_eq!(mt.id, before.get(&mt_key).unwrap().id);
    }

    assert!(!provider.plan(&changed).await.unwrap().has_changes);
}
