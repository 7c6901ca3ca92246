use quarry_core::config::ResolverConfig;
use quarry_core::repository::{ChecksumPolicy, UpdatePolicy, MAVEN_CENTRAL_ID};
use quarry_core::selector::{AuthenticationSelector, MirrorSelector, ProxySelector};

#[test]
fn defaults_from_empty_toml() {
    let config = ResolverConfig::from_toml("").unwrap();
    assert!(!config.offline);
    assert!(config.cache_not_found);
    assert!(!config.cache_transfer_errors);
    assert_eq!(config.max_concurrent_downloads, 4);
    assert_eq!(config.local_layout, "enhanced");
    assert!(config.local_repository.ends_with("repository"));
}

#[test]
fn central_is_the_fallback_repository() {
    let repos = ResolverConfig::default().remote_repositories();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].id, MAVEN_CENTRAL_ID);
}

#[test]
fn parse_full_config() {
    let toml = r#"
offline = true
local-repository = "/var/cache/m2"
update-policy = "interval:15"
checksum-policy = "fail"
cache-transfer-errors = true
ignore-missing-descriptors = true
max-concurrent-downloads = 8

[repositories.internal]
url = "https://nexus.example.com/repository/maven-public/"
snapshots = { enabled = false }

[repositories.internal.releases]
update-policy = "never"
checksum-policy = "ignore"

[[mirrors]]
id = "corp"
url = "https://mirror.example.com/maven2"
mirror-of = "*,!internal"

[[proxies]]
host = "proxy.example.com"
port = 3128
non-proxy-hosts = "*.example.com|localhost"

[credentials.internal]
username = "deploy"
password = "s3cret"
"#;
    let config = ResolverConfig::from_toml(toml).unwrap();
    assert!(config.offline);
    assert_eq!(config.local_repository.to_str(), Some("/var/cache/m2"));
    assert_eq!(config.update_policy, Some(UpdatePolicy::Interval(15)));
    assert_eq!(config.checksum_policy, Some(ChecksumPolicy::Fail));
    assert!(config.cache_transfer_errors);
    assert!(config.ignore_missing_descriptors);
    assert_eq!(config.max_concurrent_downloads, 8);

    let repos = config.remote_repositories();
    assert_eq!(repos.len(), 1);
    let internal = &repos[0];
    assert_eq!(internal.url, "https://nexus.example.com/repository/maven-public");
    assert!(!internal.snapshot_policy.enabled);
    assert_eq!(internal.release_policy.update_policy, UpdatePolicy::Never);
    assert_eq!(internal.release_policy.checksum_policy, ChecksumPolicy::Ignore);

    // The mirror excludes `internal` explicitly.
    assert!(config.mirror_selector().mirror(internal).is_none());
    let mirrored = config
        .mirror_selector()
        .mirror(&quarry_core::repository::RemoteRepository::maven_central())
        .unwrap();
    assert_eq!(mirrored.id, "corp");

    // Proxy bypassed for *.example.com.
    assert!(config.proxy_selector().proxy(internal).is_none());

    let auth = config.authentication_selector().authentication(internal).unwrap();
    assert_eq!(auth.username.as_deref(), Some("deploy"));
}

#[test]
fn invalid_update_policy_is_rejected() {
    assert!(ResolverConfig::from_toml("update-policy = \"hourly\"").is_err());
}

#[test]
fn zero_concurrency_is_rejected() {
    assert!(ResolverConfig::from_toml("max-concurrent-downloads = 0").is_err());
}

#[test]
fn load_missing_file_gives_defaults() {
    let tmp = tempfile::TempDir::new().unwrap();
    let config = ResolverConfig::load(&tmp.path().join("absent.toml")).unwrap();
    assert_eq!(config.max_concurrent_downloads, 4);
}

#[test]
fn load_reads_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "offline = true\n").unwrap();
    assert!(ResolverConfig::load(&path).unwrap().offline);
}
