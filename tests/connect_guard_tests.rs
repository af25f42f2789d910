//! Connection-accept filtering tests.

use ip_filter_engine::{AclError, ConnectGuard, FilteringConfig, LiteralValues, MapValues};

fn interrupted(result: ip_filter_engine::Result<()>) -> String {
    match result {
        Err(AclError::ConnectionInterrupted { reason }) => reason,
        other => panic!("expected interruption, got {:?}", other),
    }
}

#[test]
fn test_blacklisted_ip_is_interrupted() {
    let guard = ConnectGuard::new(FilteringConfig::new().with_blacklist([
        "192.168.0.1",
        "192.168.0.2",
        "192.168.0.3",
    ]));
    assert_eq!(
        interrupted(guard.on_connect("192.168.0.1", &LiteralValues)),
        "IP 192.168.0.1 is blacklisted and not allowed to connect"
    );
    assert!(guard.on_connect("192.168.0.4", &LiteralValues).is_ok());
}

#[test]
fn test_not_whitelisted_ip_is_interrupted() {
    let guard = ConnectGuard::new(FilteringConfig::new().with_whitelist(["10.0.0.0/8"]));
    assert_eq!(
        interrupted(guard.on_connect("192.168.0.4", &LiteralValues)),
        "IP 192.168.0.4 is not whitelisted"
    );
    assert!(guard.on_connect("10.20.30.40", &LiteralValues).is_ok());
}

#[test]
fn test_hostnames_are_ignored() {
    let config = FilteringConfig::new()
        .with_blacklist(["evil.example"])
        .with_whitelist(["partner.example", "10.0.0.0/8"]);
    let guard = ConnectGuard::new(config);

    // No DNS: hostname rules neither block nor admit
    assert!(guard.on_connect("10.0.0.1", &LiteralValues).is_ok());
    assert!(interrupted(guard.on_connect("172.16.0.1", &LiteralValues)).contains("not whitelisted"));
}

#[test]
fn test_custom_address_expression() {
    let config = FilteringConfig::new()
        .with_whitelist(["10.0.0.0/8"])
        .with_custom_ip_address("{#context.attributes['client-ip']}");
    let guard = ConnectGuard::new(config);

    let values = MapValues::new().with_value("{#context.attributes['client-ip']}", Some(" 10.1.1.1 , 8.8.8.8"));
    assert!(guard.on_connect("172.16.0.1", &values).is_ok());

    let values = MapValues::new().with_value("{#context.attributes['client-ip']}", Some(""));
    assert_eq!(
        interrupted(guard.on_connect("172.16.0.1", &values)),
        "IP 172.16.0.1 is not whitelisted"
    );
}

#[test]
fn test_inclusive_host_count() {
    let config = FilteringConfig::new()
        .with_blacklist(["192.168.1.0/31"])
        .with_inclusive_host_count(true);
    let guard = ConnectGuard::new(config);
    assert!(guard.on_connect("192.168.1.0", &LiteralValues).is_err());

    let guard = ConnectGuard::new(FilteringConfig::new().with_blacklist(["192.168.1.0/31"]));
    assert!(guard.on_connect("192.168.1.0", &LiteralValues).is_ok());
}
