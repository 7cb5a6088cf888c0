//! Error display text and per-engine conversion into the shared [`Error`]
//! taxonomy. Classification (`is_transient`/`is_terminal`/
//! `is_connection_fatal`) has its own unit tests next to the enum in
//! `src/error.rs`; this file covers the boundary conversions instead.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sql_client::Error;

#[test]
fn connection_closed_displays_without_arguments() {
    assert_eq!(Error::ConnectionClosed.to_string(), "connection closed");
}

#[test]
fn server_error_display_includes_code_and_message() {
    let err = Error::ServerError {
        code: 547,
        sqlstate: None,
        message: "FOREIGN KEY constraint violation".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("547"));
    assert!(msg.contains("FOREIGN KEY"));
}

#[test]
fn timeout_displays_a_fixed_message() {
    assert_eq!(Error::Timeout.to_string(), "timed out");
}

#[test]
fn io_error_is_wrapped_and_displayed() {
    let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
    let err: Error = io_err.into();
    assert!(err.to_string().contains("reset by peer"));
}

#[test]
fn postgres_server_error_carries_its_sqlstate() {
    let pg_err = pg_protocol::ProtocolError::Server {
        code: "23505".into(),
        message: "duplicate key value".into(),
    };
    let err: Error = pg_err.into();
    match err {
        Error::ServerError { sqlstate, message, .. } => {
            assert_eq!(sqlstate, Some("23505".into()));
            assert!(message.contains("duplicate key"));
        }
        other => panic!("expected ServerError, got {other:?}"),
    }
}

#[test]
fn postgres_server_error_is_not_connection_fatal() {
    let pg_err = pg_protocol::ProtocolError::Server {
        code: "XX000".into(),
        message: "ignored".into(),
    };
    // A server error drains the response stream before surfacing, so the
    // connection stays usable regardless of how severe the message sounds.
    let err: Error = pg_err.into();
    assert!(!err.is_connection_fatal());
}

#[test]
fn mysql_server_error_preserves_numeric_code_and_sqlstate() {
    let mysql_err = mysql_protocol::ProtocolError::Server {
        code: 1062,
        sql_state: Some("23000".into()),
        message: "Duplicate entry".into(),
    };
    let err: Error = mysql_err.into();
    match err {
        Error::ServerError { code, sqlstate, .. } => {
            assert_eq!(code, 1062);
            assert_eq!(sqlstate, Some("23000".into()));
        }
        other => panic!("expected ServerError, got {other:?}"),
    }
}

#[test]
fn mysql_full_auth_without_tls_maps_to_unsupported() {
    let err: Error = mysql_protocol::ProtocolError::FullAuthRequiresTls.into();
    assert!(matches!(err, Error::Unsupported(_)));
}

#[test]
fn mysql_connection_closed_maps_to_protocol_error() {
    let err: Error = mysql_protocol::ProtocolError::ConnectionClosed.into();
    assert!(matches!(err, Error::ProtocolError(_)));
    assert!(err.is_connection_fatal());
}

#[test]
fn tds_codec_error_maps_to_protocol_error_and_is_connection_fatal() {
    let err: Error = tds_codec::CodecError::ConnectionClosed.into();
    assert!(matches!(err, Error::ProtocolError(_)));
    assert!(err.is_connection_fatal());
}

#[test]
fn type_mismatch_is_local_and_not_connection_fatal() {
    let type_err = sql_core::error::TypeError::OutOfRange {
        target_type: "i32",
    };
    let err: Error = type_err.into();
    assert!(matches!(err, Error::TypeMismatch(_)));
    assert!(!err.is_connection_fatal());
    assert!(!err.is_transient());
}
