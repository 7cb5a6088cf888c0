//! Connection string parsing edge cases.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sql_client::{Config, TlsPolicy};

#[test]
fn empty_connection_string_parses_to_defaults() {
    let config = Config::from_connection_string("").unwrap();
    assert_eq!(config.host, "localhost");
}

#[test]
fn whitespace_and_bare_semicolons_are_ignored() {
    assert!(Config::from_connection_string("   \t\n  ").is_ok());
    assert!(Config::from_connection_string(";").is_ok());
    assert!(Config::from_connection_string(";;;").is_ok());
}

#[test]
fn missing_equals_sign_is_rejected() {
    assert!(Config::from_connection_string("Serverlocalhost;").is_err());
}

#[test]
fn value_containing_equals_keeps_everything_after_the_first() {
    let config =
        Config::from_connection_string("Server=localhost;Password=pass=word=with=equals;")
            .unwrap();
    assert_eq!(config.password, "pass=word=with=equals");
}

#[test]
fn keys_are_case_insensitive() {
    let a = Config::from_connection_string("SERVER=host1;").unwrap();
    let b = Config::from_connection_string("server=host1;").unwrap();
    let c = Config::from_connection_string("Server=host1;").unwrap();
    assert_eq!(a.host, b.host);
    assert_eq!(b.host, c.host);
}

#[test]
fn data_source_is_an_alias_for_server() {
    let a = Config::from_connection_string("Server=host1;").unwrap();
    let b = Config::from_connection_string("Data Source=host1;").unwrap();
    assert_eq!(a.host, "host1");
    assert_eq!(b.host, "host1");
}

#[test]
fn initial_catalog_is_an_alias_for_database() {
    let a = Config::from_connection_string("Database=db1;").unwrap();
    let b = Config::from_connection_string("Initial Catalog=db1;").unwrap();
    assert_eq!(a.database, b.database);
}

#[test]
fn user_id_and_password_aliases_parse() {
    assert!(Config::from_connection_string("User Id=user1;").is_ok());
    assert!(Config::from_connection_string("UID=user1;").is_ok());
    assert!(Config::from_connection_string("Password=pass1;").is_ok());
    assert!(Config::from_connection_string("PWD=pass1;").is_ok());
}

#[test]
fn server_with_port_splits_host_and_port() {
    let config = Config::from_connection_string("Server=myserver,1434;").unwrap();
    assert_eq!(config.host, "myserver");
    assert_eq!(config.port, 1434);
}

#[test]
fn invalid_port_number_is_rejected() {
    assert!(Config::from_connection_string("Server=localhost,abc;").is_err());
}

#[test]
fn trust_server_certificate_accepts_common_true_and_false_spellings() {
    for case in ["true", "True", "TRUE", "yes", "1"] {
        let conn_str = format!("TrustServerCertificate={case};");
        assert!(Config::from_connection_string(&conn_str).unwrap().trust_server_certificate);
    }
    for case in ["false", "False", "FALSE", "no", "0"] {
        let conn_str = format!("TrustServerCertificate={case};");
        assert!(!Config::from_connection_string(&conn_str).unwrap().trust_server_certificate);
    }
}

#[test]
fn connect_timeout_and_its_alias_parse_seconds() {
    let a = Config::from_connection_string("Connect Timeout=30;").unwrap();
    assert_eq!(a.timeouts.connect_timeout.as_secs(), 30);

    let b = Config::from_connection_string("Connection Timeout=60;").unwrap();
    assert_eq!(b.timeouts.connect_timeout.as_secs(), 60);
}

#[test]
fn invalid_timeout_value_is_rejected() {
    assert!(Config::from_connection_string("Connect Timeout=abc;").is_err());
}

#[test]
fn encrypt_strict_maps_to_tls_require() {
    let config = Config::from_connection_string("Encrypt=strict;").unwrap();
    assert_eq!(config.tls, TlsPolicy::Require);

    let config = Config::from_connection_string("Encrypt=STRICT;").unwrap();
    assert_eq!(config.tls, TlsPolicy::Require);
}

#[test]
fn encrypt_false_maps_to_tls_disable() {
    let config = Config::from_connection_string("Encrypt=false;").unwrap();
    assert_eq!(config.tls, TlsPolicy::Disable);
}

#[test]
fn whitespace_around_keys_and_values_is_trimmed() {
    let config = Config::from_connection_string("Server =  localhost  ;").unwrap();
    assert_eq!(config.host, "localhost");
}

#[test]
fn unknown_keys_are_ignored_for_forward_compatibility() {
    let config = Config::from_connection_string(
        "Server=localhost;UnknownOption=value;FutureFeature=enabled;",
    );
    assert!(config.is_ok());
}

#[test]
fn repeated_keys_let_the_last_value_win() {
    let config =
        Config::from_connection_string("Server=first;Server=second;Server=third;").unwrap();
    assert_eq!(config.host, "third");
}

#[test]
fn full_connection_string_populates_every_field() {
    let conn_str = "Server=myserver.example.com;\
                    Database=mydb;\
                    User Id=admin;\
                    Password=P@ssw0rd!;\
                    Encrypt=strict;\
                    TrustServerCertificate=false;\
                    Connect Timeout=30;";

    let config = Config::from_connection_string(conn_str).unwrap();

    assert_eq!(config.host, "myserver.example.com");
    assert_eq!(config.database, Some("mydb".to_string()));
    assert_eq!(config.tls, TlsPolicy::Require);
    assert!(!config.trust_server_certificate);
    assert_eq!(config.timeouts.connect_timeout.as_secs(), 30);
}

#[test]
fn connection_string_without_trailing_semicolon_still_parses() {
    let config = Config::from_connection_string("Server=localhost;Database=test").unwrap();
    assert_eq!(config.host, "localhost");
    assert_eq!(config.database, Some("test".to_string()));
}
