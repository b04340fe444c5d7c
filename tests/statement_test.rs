//! Statement execution, retry and reconnect against a scripted driver.

mod common;

use common::*;
use mysql_resilient::{ConnectionSettings, DbError, Placeholders, QueryResult, Session};

#[test]
fn test_connect_sets_charset() {
    let driver = ScriptedDriver::new();
    let settings = ConnectionSettings {
        charset: "utf8mb4".to_string(),
        ..ConnectionSettings::default()
    };
    let mut session = Session::new(driver.clone(), settings);

    assert!(!session.is_connected());
    session.connect().unwrap();
    assert!(session.is_connected());
    assert_eq!(
        driver.calls(),
        vec![Call::Connect, Call::SetCharset("utf8mb4".to_string())]
    );
}

#[test]
fn test_connect_twice_fails() {
    let driver = ScriptedDriver::new();
    let mut session = connected_session(&driver);

    assert!(matches!(session.connect(), Err(DbError::AlreadyConnected)));
    assert!(driver.calls().is_empty());
}

#[test]
fn test_close_requires_connection() {
    let driver = ScriptedDriver::new();
    let mut session = connected_session(&driver);

    session.close().unwrap();
    assert!(!session.is_connected());
    assert!(matches!(session.close(), Err(DbError::NotConnected)));
    assert_eq!(driver.calls(), vec![Call::Close]);
}

#[test]
fn test_connect_failure() {
    let driver = ScriptedDriver::new();
    driver.fail_connect(ACCESS_DENIED);
    let mut session = Session::new(driver.clone(), ConnectionSettings::default());

    let err = session.connect().unwrap_err();
    assert!(matches!(err, DbError::Connection { code: ACCESS_DENIED, .. }));
    assert!(!session.is_connected());

    // The next attempt is allowed
    session.connect().unwrap();
    assert!(session.is_connected());
}

#[test]
fn test_charset_failure_closes_driver() {
    let driver = ScriptedDriver::new();
    driver.fail_charset(1115);
    let mut session = Session::new(driver.clone(), ConnectionSettings::default());

    let err = session.connect().unwrap_err();
    assert_eq!(err.code(), Some(1115));
    assert!(!session.is_connected());
    assert_eq!(
        driver.calls(),
        vec![
            Call::Connect,
            Call::SetCharset("utf8".to_string()),
            Call::Close
        ]
    );
}

#[test]
fn test_execute_requires_connection() {
    let driver = ScriptedDriver::new();
    let mut session = Session::new(driver.clone(), ConnectionSettings::default());

    assert!(matches!(session.query("SELECT 1"), Err(DbError::NotConnected)));
    assert!(matches!(session.escape("x"), Err(DbError::NotConnected)));
    assert!(driver.calls().is_empty());
}

#[test]
fn test_execute_returns_driver_result() {
    let driver = ScriptedDriver::new();
    driver.respond(
        "DELETE FROM t WHERE id < 10",
        QueryResult::write_result(3, None),
    );
    let mut session = connected_session(&driver);

    let result = session.query("DELETE FROM t WHERE id < 10").unwrap();
    assert_eq!(result.rows_affected, 3);
}

#[test]
fn test_deadlock_outside_transaction_retries_statement() {
    let driver = ScriptedDriver::new();
    driver.fail_times("UPDATE t SET a = 1", DEADLOCK, 3);
    let mut session = connected_session(&driver);

    session.query("UPDATE t SET a = 1").unwrap();
    assert_eq!(driver.count("UPDATE t SET a = 1"), 4);
    // No reconnect for lock conflicts
    assert!(!driver.calls().contains(&Call::Close));
}

#[test]
fn test_lock_wait_timeout_outside_transaction_retries_statement() {
    let driver = ScriptedDriver::new();
    driver.fail("UPDATE t SET a = 1", LOCK_WAIT_TIMEOUT);
    let mut session = connected_session(&driver);

    session.query("UPDATE t SET a = 1").unwrap();
    assert_eq!(driver.count("UPDATE t SET a = 1"), 2);
}

#[test]
fn test_statement_retry_limit() {
    let driver = ScriptedDriver::new();
    driver.fail_times("UPDATE t SET a = 1", DEADLOCK, 10);
    let mut session = connected_session(&driver);

    let err = session.query("UPDATE t SET a = 1").unwrap_err();
    assert!(matches!(
        err,
        DbError::MaxAttemptsExceeded {
            operation: "statement",
            attempts: 10
        }
    ));
    assert_eq!(driver.count("UPDATE t SET a = 1"), 10);
}

#[test]
fn test_nine_failures_still_succeed() {
    let driver = ScriptedDriver::new();
    driver.fail_times("UPDATE t SET a = 1", DEADLOCK, 9);
    let mut session = connected_session(&driver);

    session.query("UPDATE t SET a = 1").unwrap();
    assert_eq!(driver.count("UPDATE t SET a = 1"), 10);
}

#[test]
fn test_connection_lost_reconnects_and_retries() {
    let driver = ScriptedDriver::new();
    driver.fail("SELECT 1", GONE_AWAY);
    let mut session = connected_session(&driver);

    session.query("SELECT 1").unwrap();
    assert!(session.is_connected());
    assert_eq!(
        driver.calls(),
        vec![
            Call::Query("SELECT 1".to_string()),
            Call::Close,
            Call::Connect,
            Call::SetCharset("utf8".to_string()),
            Call::Query("SELECT 1".to_string()),
        ]
    );
}

#[test]
fn test_node_not_ready_reconnects() {
    let driver = ScriptedDriver::new();
    driver.fail("SELECT 1", NODE_NOT_READY);
    let mut session = connected_session(&driver);

    session.query("SELECT 1").unwrap();
    assert_eq!(
        driver.calls().iter().filter(|c| **c == Call::Connect).count(),
        1
    );
}

#[test]
fn test_failed_reconnect_surfaces_connection_error() {
    let driver = ScriptedDriver::new();
    driver.fail("SELECT 1", GONE_AWAY);
    let mut session = connected_session(&driver);
    // Only the reconnect fails
    driver.fail_connect(2003);

    let err = session.query("SELECT 1").unwrap_err();
    assert!(matches!(err, DbError::Connection { code: 2003, .. }));
    assert!(!session.is_connected());
    assert_eq!(driver.count("SELECT 1"), 1);
}

#[test]
fn test_fatal_error_not_retried() {
    let driver = ScriptedDriver::new();
    driver.fail("SELEKT 1", SYNTAX_ERROR);
    let mut session = connected_session(&driver);

    let err = session.query("SELEKT 1").unwrap_err();
    assert!(matches!(err, DbError::General { code: SYNTAX_ERROR, .. }));
    assert!(!err.is_retryable());
    assert_eq!(driver.queries(), strings(&["SELEKT 1"]));
}

#[test]
fn test_escape_uses_driver() {
    let driver = ScriptedDriver::new();
    let session = connected_session(&driver);

    assert_eq!(session.escape(r#"say "hi""#).unwrap(), r#"say \"hi\""#);
}

#[test]
fn test_close_forgets_transaction() {
    let driver = ScriptedDriver::new();
    let mut session = connected_session(&driver);

    session.begin_scope().unwrap();
    session.begin_scope().unwrap();
    assert_eq!(session.depth().savepoints(), 1);

    session.close().unwrap();
    assert!(!session.depth().in_transaction());
    assert_eq!(session.depth().savepoints(), 0);
}

#[test]
fn test_execute_with_placeholders() {
    let driver = ScriptedDriver::new();
    let mut session = connected_session(&driver);

    session
        .execute(
            "SELECT * FROM t WHERE id=:id;",
            &Placeholders::new().bind("id", 10),
        )
        .unwrap();
    assert_eq!(driver.queries(), strings(&[r#"SELECT * FROM t WHERE id="10";"#]));
}

#[test]
fn test_placeholders_substituted_on_retry() {
    let driver = ScriptedDriver::new();
    driver.fail(r#"UPDATE t SET a = "x""#, DEADLOCK);
    let mut session = connected_session(&driver);

    session
        .execute("UPDATE t SET a = :a", &Placeholders::new().bind("a", "x"))
        .unwrap();
    assert_eq!(driver.count(r#"UPDATE t SET a = "x""#), 2);
}
