use std::io::Write;

use boot_model::{ClusterType, Config, ModelError, ServiceKind, ServiceUrl, Volume};

const SAMPLE: &str = r#"
Clusters:
  zzzzz:
    ManagementToken: e687950a23c3a9bceec28c6223a06c79
    Services:
      Controller:
        ExternalURL: "https://localhost:8000"
        InternalURLs:
          "http://localhost:8003": {}
      Websocket:
        ExternalURL: ""
    SystemLogs:
      Format: json
      LogLevel: debug
"#;

#[test]
fn parses_yaml_and_fills_cluster_id_from_key() {
    let cfg = Config::from_yaml(SAMPLE).unwrap();
    let cluster = cfg.single_cluster().unwrap();

    assert_eq!(cluster.cluster_id, "zzzzz");
    assert_eq!(cluster.management_token, "e687950a23c3a9bceec28c6223a06c79");
    assert_eq!(
        cluster.services.controller.external_url,
        Some(ServiceUrl::new("https", "localhost:8000"))
    );
    assert_eq!(cluster.services.controller.internal_port().unwrap(), "8003");
    assert!(cluster.services.websocket.external_url.is_none());
    assert_eq!(cluster.system_logs.format, "json");
    assert!(cluster.services.get(ServiceKind::Keepstore).internal_urls.is_empty());
}

#[test]
fn load_reads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();

    let cfg = Config::load(file.path()).unwrap();
    assert!(cfg.clusters.contains_key("zzzzz"));

    let missing = Config::load("/nonexistent/boot/config.yml");
    assert!(matches!(missing, Err(ModelError::Read { .. })));
}

#[test]
fn single_cluster_rejects_empty_and_ambiguous_documents() {
    let empty = Config::from_yaml("Clusters: {}").unwrap();
    assert!(matches!(empty.single_cluster(), Err(ModelError::NoCluster)));

    let two = Config::from_yaml("Clusters:\n  aaaaa: {}\n  bbbbb: {}\n").unwrap();
    assert!(matches!(
        two.single_cluster(),
        Err(ModelError::MultipleClusters(ids)) if ids == ["aaaaa", "bbbbb"]
    ));

    let blank = Config::from_yaml("Clusters:\n  \"\": {}\n").unwrap();
    assert!(matches!(blank.single_cluster(), Err(ModelError::MissingClusterId)));

    let mismatch = Config::from_yaml("Clusters:\n  aaaaa:\n    ClusterID: bbbbb\n").unwrap();
    assert!(matches!(
        mismatch.single_cluster(),
        Err(ModelError::ClusterIdMismatch { .. })
    ));
}

#[test]
fn malformed_document_is_a_parse_error() {
    assert!(matches!(
        Config::from_yaml("Clusters: [1, 2"),
        Err(ModelError::Parse(_))
    ));
    assert!(matches!(
        Config::from_yaml("Clusters:\n  zzzzz:\n    Services:\n      Controller:\n        ExternalURL: nonsense\n"),
        Err(ModelError::Parse(_))
    ));
}

#[test]
fn written_json_is_readable_as_config() {
    let mut cluster = Config::from_yaml(SAMPLE).unwrap().single_cluster().unwrap();
    let via = ServiceUrl::new("http", "localhost:9001");
    cluster
        .volumes
        .insert("zzzzz-nyw5e-000000000000000".to_string(), Volume::directory("/tmp/keep0.data", via.clone()));

    let mut buf = Vec::new();
    Config::with_cluster(cluster.clone()).write_json(&mut buf).unwrap();

    let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    let vol = &json["Clusters"]["zzzzz"]["Volumes"]["zzzzz-nyw5e-000000000000000"];
    assert_eq!(vol["Driver"], "Directory");
    assert_eq!(vol["DriverParameters"]["Root"], "/tmp/keep0.data");
    assert!(vol["AccessViaHosts"].get("http://localhost:9001").is_some());

    let back = Config::from_yaml(std::str::from_utf8(&buf).unwrap()).unwrap();
    assert_eq!(back.single_cluster().unwrap(), cluster);
}

const WITH_UNTYPED_KEYS: &str = r#"
SourceTimestamp: "2020-01-01T00:00:00Z"
Clusters:
  zzzzz:
    Users:
      AnonymousUserToken: anon
    Login:
      Test:
        Enable: true
        Users:
          alice: {Email: alice@example.com, Password: xyzzy}
    PostgreSQL:
      ConnectionPool: 32
      Connection:
        host: localhost
        port: 5432
    TLS:
      Insecure: true
      ACME: {Server: ""}
    Services:
      Workbench2:
        ExternalURL: "https://localhost:3001"
      Controller:
        ExternalURL: "https://localhost:8000"
        InternalURLs:
          "http://localhost:8003": {ListenURL: "http://0.0.0.0:8003", Rendezvous: r1}
      Keepstore:
        InternalURLs: {}
"#;

#[test]
fn untyped_keys_survive_the_json_write() {
    let cfg = Config::from_yaml(WITH_UNTYPED_KEYS).unwrap();
    let cluster = cfg.single_cluster().unwrap();
    assert_eq!(cluster.postgresql.connection["port"], "5432");
    assert!(cluster.tls.insecure);

    let mut buf = Vec::new();
    cfg.write_json(&mut buf).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();

    assert_eq!(json["SourceTimestamp"], "2020-01-01T00:00:00Z");
    let z = &json["Clusters"]["zzzzz"];
    assert_eq!(z["Users"]["AnonymousUserToken"], "anon");
    assert_eq!(z["Login"]["Test"]["Enable"], true);
    assert_eq!(z["Login"]["Test"]["Users"]["alice"]["Password"], "xyzzy");
    assert_eq!(z["PostgreSQL"]["ConnectionPool"], 32);
    assert_eq!(z["PostgreSQL"]["Connection"]["port"], "5432");
    assert_eq!(z["TLS"]["ACME"]["Server"], "");
    assert_eq!(z["Services"]["Workbench2"]["ExternalURL"], "https://localhost:3001");
    let instance = &z["Services"]["Controller"]["InternalURLs"]["http://localhost:8003"];
    assert_eq!(instance["ListenURL"], "http://0.0.0.0:8003");
    assert_eq!(instance["Rendezvous"], "r1");

    let back = Config::from_yaml(std::str::from_utf8(&buf).unwrap()).unwrap();
    assert_eq!(back, cfg);
}

#[test]
fn urls_with_bad_ports_fail_at_load() {
    for url in ["http://localhost:notaport", "http://localhost:99999"] {
        let doc = format!(
            "Clusters:\n  zzzzz:\n    Services:\n      Keepstore:\n        InternalURLs:\n          \"{url}\": {{}}\n"
        );
        let err = Config::from_yaml(&doc).unwrap_err();
        assert!(matches!(err, ModelError::Parse(_)), "{url}: {err}");
        assert!(err.to_string().contains(url), "{url}: {err}");
    }
}

#[test]
fn cluster_type_round_trips_through_serde() {
    let t: ClusterType = serde_yaml::from_str("test").unwrap();
    assert_eq!(t, ClusterType::Test);
}
