//! Change notifications through the connection: subscribe, poll, listeners.

use std::cell::RefCell;
use std::rc::Rc;

use cipherlite_driver::{BoundValues, ConnectOptions, Connection, DriverError, Notification};

fn with_tables() -> Connection {
    let conn = Connection::open(":memory:", None, &ConnectOptions::default()).unwrap();
    conn.query("CREATE TABLE orders (id INTEGER PRIMARY KEY, v)", &BoundValues::new())
        .unwrap();
    conn.query("CREATE TABLE audit (id INTEGER PRIMARY KEY, v)", &BoundValues::new())
        .unwrap();
    conn
}

fn run(conn: &Connection, sql: &str) {
    conn.query(sql, &BoundValues::new()).unwrap();
}

#[test]
fn only_subscribed_tables_notify() {
    let mut conn = with_tables();
    conn.subscribe("orders").unwrap();

    run(&conn, "INSERT INTO orders (v) VALUES ('a')");
    run(&conn, "INSERT INTO audit (v) VALUES ('a')");
    run(&conn, "UPDATE orders SET v = 'b' WHERE id = 1");

    let events = conn.poll_notifications();
    assert_eq!(
        events,
        vec![
            Notification::TableChanged { table: "orders".into() },
            Notification::RowChanged { table: "orders".into(), row_id: 1 },
            Notification::TableChanged { table: "orders".into() },
            Notification::RowChanged { table: "orders".into(), row_id: 1 },
        ]
    );
    assert!(conn.poll_notifications().is_empty());
}

#[test]
fn change_before_subscribe_is_not_delivered() {
    let mut conn = with_tables();
    conn.subscribe("orders").unwrap();
    run(&conn, "INSERT INTO audit (v) VALUES ('early')");
    conn.subscribe("audit").unwrap();

    assert!(conn.poll_notifications().is_empty());

    run(&conn, "INSERT INTO audit (v) VALUES ('late')");
    assert_eq!(
        conn.poll_notifications(),
        vec![
            Notification::TableChanged { table: "audit".into() },
            Notification::RowChanged { table: "audit".into(), row_id: 2 },
        ]
    );
}

#[test]
fn unsubscribe_discards_pending_changes() {
    let mut conn = with_tables();
    conn.subscribe("orders").unwrap();
    conn.subscribe("audit").unwrap();
    run(&conn, "INSERT INTO orders (v) VALUES (1)");
    conn.unsubscribe("orders").unwrap();

    assert!(conn.poll_notifications().is_empty());
}

#[test]
fn unsubscribe_stops_delivery() {
    let mut conn = with_tables();
    conn.subscribe("orders").unwrap();
    conn.subscribe("audit").unwrap();
    assert_eq!(conn.subscribed_names(), ["orders", "audit"]);

    conn.unsubscribe("orders").unwrap();
    run(&conn, "INSERT INTO orders (v) VALUES (1)");
    run(&conn, "INSERT INTO audit (v) VALUES (1)");

    let tables: Vec<_> = conn
        .poll_notifications()
        .iter()
        .map(|n| n.table().to_string())
        .collect();
    assert_eq!(tables, vec!["audit", "audit"]);

    conn.unsubscribe("audit").unwrap();
    run(&conn, "INSERT INTO audit (v) VALUES (2)");
    assert!(conn.poll_notifications().is_empty());
    assert!(conn.subscribed_names().is_empty());
}

#[test]
fn subscription_errors() {
    let mut conn = with_tables();
    conn.subscribe("orders").unwrap();
    assert_eq!(
        conn.subscribe("orders").unwrap_err(),
        DriverError::AlreadySubscribed { table: "orders".into() }
    );
    assert_eq!(
        conn.unsubscribe("audit").unwrap_err(),
        DriverError::NotSubscribed { table: "audit".into() }
    );
}

#[test]
fn listeners_receive_in_registration_order() {
    let mut conn = with_tables();
    let log = Rc::new(RefCell::new(Vec::new()));
    for tag in ["first", "second"] {
        let log = Rc::clone(&log);
        conn.on_notification(move |n| {
            if let Notification::RowChanged { row_id, .. } = n {
                log.borrow_mut().push(format!("{tag}:{row_id}"));
            }
        });
    }
    conn.subscribe("orders").unwrap();
    run(&conn, "INSERT INTO orders (id, v) VALUES (42, 'x')");
    conn.poll_notifications();

    assert_eq!(*log.borrow(), vec!["first:42", "second:42"]);
}

#[test]
fn close_clears_subscriptions() {
    let mut conn = with_tables();
    conn.subscribe("orders").unwrap();
    run(&conn, "INSERT INTO orders (v) VALUES (1)");
    conn.close().unwrap();
    assert!(conn.subscribed_names().is_empty());
    assert!(conn.poll_notifications().is_empty());
    assert_eq!(conn.subscribe("orders").unwrap_err(), DriverError::NotOpen);
}
