use super::*;
use crate::error::StackError;
use crate::manifest::StackParams;

#[test]
fn test_parse_empty_document() {
    let config = parse_stack_string("").unwrap();
    assert_eq!(config.params, StackParams::default());
    assert_eq!(config.provider.name, "local");
    assert_eq!(config.region(), "us-east-1");
}

#[test]
fn test_parse_stack_overrides() {
    let kdl = r#"
        stack "db" {
            network-cidr "172.16.0.0/16"
            availability-zones 3
            region "ap-northeast-1"
            database-port 27018
            storage-port 2049
            image "mongo:7"
            memory 512
            desired-count 3
            container-path "/var/lib/mongo"
        }
    "#;

    let config = parse_stack_string(kdl).unwrap();
    let params = &config.params;
    assert_eq!(params.service_name, "db");
    assert_eq!(params.network_cidr.to_string(), "172.16.0.0/16");
    assert_eq!(params.availability_zones, 3);
    assert_eq!(params.region, "ap-northeast-1");
    assert_eq!(params.database_port, 27018);
    assert_eq!(params.image, "mongo:7");
    assert_eq!(params.memory, 512);
    assert_eq!(params.desired_count, 3);
    assert_eq!(params.container_path, "/var/lib/mongo");
}

#[test]
fn test_parse_snake_case_aliases() {
    let kdl = r#"
        stack {
            desired_count 4
            database_port 28000
        }
    "#;

    let config = parse_stack_string(kdl).unwrap();
    // 名前がなければデフォルトのまま
    assert_eq!(config.params.service_name, "mongo");
    assert_eq!(config.params.desired_count, 4);
    assert_eq!(config.params.database_port, 28000);
}

#[test]
fn test_parse_provider() {
    let kdl = r#"
        provider "local" {
            region "eu-west-1"
            account "000000000000"
        }
    "#;

    let config = parse_stack_string(kdl).unwrap();
    assert_eq!(config.provider.name, "local");
    assert_eq!(config.provider.region.as_deref(), Some("eu-west-1"));
    assert_eq!(
        config.provider.config.get("account"),
        Some(&"000000000000".to_string())
    );
    assert_eq!(config.region(), "eu-west-1");
}

#[test]
fn test_provider_requires_name() {
    let result = parse_stack_string("provider { region \"us-east-1\" }");
    assert!(matches!(result, Err(StackError::InvalidConfig(_))));
}

#[test]
fn test_port_out_of_range() {
    let kdl = r#"
        stack "mongo" {
            database-port 70000
        }
    "#;
    assert!(matches!(
        parse_stack_string(kdl),
        Err(StackError::InvalidConfig(_))
    ));
}

#[test]
fn test_negative_replicas() {
    let kdl = r#"
        stack "mongo" {
            desired-count -1
        }
    "#;
    assert!(parse_stack_string(kdl).is_err());
}

#[test]
fn test_invalid_cidr() {
    let kdl = r#"
        stack "mongo" {
            network-cidr "10.0.0.1/16"
        }
    "#;
    assert!(matches!(
        parse_stack_string(kdl),
        Err(StackError::InvalidCidr(_))
    ));
}

#[test]
fn test_invalid_params_rejected() {
    let kdl = r#"
        stack "mongo" {
            availability-zones 1
        }
    "#;
    assert!(parse_stack_string(kdl).is_err());
}

#[test]
fn test_unknown_nodes_ignored() {
    let kdl = r#"
        project "demo"
        stack "mongo" {
            color "blue"
        }
    "#;
    let config = parse_stack_string(kdl).unwrap();
    assert_eq!(config.params, StackParams::default());
}

#[test]
fn test_invalid_kdl() {
    assert!(matches!(
        parse_stack_string("stack \"mongo\" {"),
        Err(StackError::KdlParse(_))
    ));
}

#[test]
fn test_parse_stack_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stack.kdl");
    std::fs::write(&path, "stack \"mongo\" {\n    desired-count 5\n}\n").unwrap();

    let config = parse_stack_file(&path).unwrap();
    assert_eq!(config.params.desired_count, 5);

    assert!(matches!(
        parse_stack_file(dir.path().join("missing.kdl")),
        Err(StackError::Io(_))
    ));
}
