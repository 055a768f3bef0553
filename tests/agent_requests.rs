//! Request handling over a real UDP socket.

mod common;

use common::*;
use snmp_mib_agent::{
    ErrorStatus, ManagedObject, Message, Pdu, PduType, SetResult, Syntax, Value, VarBind, Version,
    demo, oid,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// =============================================================================
// GET / GETNEXT / GETBULK
// =============================================================================

#[tokio::test]
async fn test_get_values() {
    let agent = TestAgent::new().await;
    let manager = Manager::new(agent.addr()).await;

    let response = manager
        .get(COMMUNITY_RO, &[test_description(), test_count(), nonexistent_oid()])
        .await;

    assert_eq!(response.pdu_type, PduType::Response);
    assert_eq!(response.error_status, 0);
    assert_eq!(response.varbinds[0].value, Value::from("My Description"));
    assert_eq!(response.varbinds[1].value, Value::Integer(0));
    assert_eq!(response.varbinds[2].oid, nonexistent_oid());
    assert_eq!(response.varbinds[2].value, Value::NoSuchObject);
}

#[tokio::test]
async fn test_v1_get_missing_object() {
    let agent = TestAgent::new().await;
    let manager = Manager::new(agent.addr()).await;

    let response = manager
        .request(
            Version::V1,
            COMMUNITY_RO,
            Pdu::get_request(3, &[test_count(), nonexistent_oid()]),
        )
        .await
        .unwrap();

    assert_eq!(response.error_status_enum(), ErrorStatus::NoSuchName);
    assert_eq!(response.error_index, 2);
    // the request bindings come back unchanged
    assert_eq!(response.varbinds[1].value, Value::Null);
}

#[tokio::test]
async fn test_walk_enterprise() {
    let agent = TestAgent::new().await;
    let manager = Manager::new(agent.addr()).await;

    let mut cursor = enterprise();
    let mut walked = Vec::new();
    loop {
        let response = manager
            .request(Version::V2c, COMMUNITY_RO, Pdu::get_next_request(5, &[cursor.clone()]))
            .await
            .unwrap();
        let vb = response.varbinds.into_iter().next().unwrap();
        if vb.value == Value::EndOfMibView {
            break;
        }
        assert!(vb.oid > cursor);
        cursor = vb.oid.clone();
        walked.push(vb.oid);
    }

    assert_eq!(walked, vec![test_description(), test_count(), test_level()]);
}

#[tokio::test]
async fn test_getbulk_interleaves_columns() {
    let agent = TestAgent::new().await;
    let manager = Manager::new(agent.addr()).await;

    let response = manager
        .request(
            Version::V2c,
            COMMUNITY_RO,
            Pdu::get_bulk(6, 1, 3, &[enterprise(), enterprise(), test_count()]),
        )
        .await
        .unwrap();

    let oids: Vec<_> = response.varbinds.iter().map(|vb| vb.oid.clone()).collect();
    assert_eq!(
        oids,
        vec![
            // non-repeater
            test_description(),
            // row 1
            test_description(),
            test_level(),
            // row 2
            test_count(),
            test_level(),
            // row 3
            test_level(),
            test_level(),
        ]
    );
    assert_eq!(response.varbinds[2].value, Value::Integer(5));
    // the second column ran out in row 2 and stays exhausted
    assert_eq!(response.varbinds[4].value, Value::EndOfMibView);
    assert_eq!(response.varbinds[6].value, Value::EndOfMibView);
}

#[tokio::test]
async fn test_getbulk_zero_repetitions() {
    let agent = TestAgent::new().await;
    let manager = Manager::new(agent.addr()).await;

    let response = manager
        .request(
            Version::V2c,
            COMMUNITY_RO,
            Pdu::get_bulk(8, 0, 0, &[enterprise()]),
        )
        .await
        .unwrap();

    assert_eq!(response.error_status, 0);
    assert!(response.varbinds.is_empty());
}

#[tokio::test]
async fn test_getbulk_truncated_to_message_size() {
    let agent = TestAgent::with_builder(|mut b| {
        for row in 1..=200u32 {
            b = b.object(
                oid!(1, 3, 6, 1, 4, 1, 99999, 3, row),
                ManagedObject::variable(Syntax::OctetString, Value::from("x".repeat(32))),
            );
        }
        b.max_message_size(600)
    })
    .await;
    let manager = Manager::new(agent.addr()).await;

    let response = manager
        .request(
            Version::V2c,
            COMMUNITY_RO,
            Pdu::get_bulk(9, 0, 200, &[enterprise()]),
        )
        .await
        .unwrap();

    assert_eq!(response.error_status, 0);
    assert!(!response.varbinds.is_empty());
    assert!(response.varbinds.len() < 200);
}

// =============================================================================
// Access Control
// =============================================================================

#[tokio::test]
async fn test_unknown_community() {
    let agent = TestAgent::new().await;
    let manager = Manager::new(agent.addr()).await;

    let response = manager
        .request(Version::V2c, b"guess", Pdu::get_request(4, &[test_count()]))
        .await
        .unwrap();

    assert_eq!(response.error_status_enum(), ErrorStatus::AuthorizationError);
    assert_eq!(response.error_index, 0);
    assert_eq!(agent.agent().stats().in_bad_community_names, 1);
}

#[tokio::test]
async fn test_write_only_community_cannot_read() {
    let agent = TestAgent::with_builder(|b| b.vacm(|v| v.write_only("drop-box", enterprise())))
        .await;
    let manager = Manager::new(agent.addr()).await;

    let response = manager.get(b"drop-box", &[test_count()]).await;
    assert_eq!(response.error_status_enum(), ErrorStatus::NoAccess);
    assert_eq!(response.error_index, 1);

    // but it may write
    let response = manager
        .set(b"drop-box", vec![VarBind::new(test_count(), Value::Integer(12))])
        .await;
    assert_eq!(response.error_status, 0);
    assert_eq!(agent.agent().mib().get(&test_count()), Some(Value::Integer(12)));
}

#[tokio::test]
async fn test_read_only_community_cannot_write() {
    let agent = TestAgent::new().await;
    let manager = Manager::new(agent.addr()).await;

    let response = manager
        .set(COMMUNITY_RO, vec![VarBind::new(test_count(), Value::Integer(1))])
        .await;

    assert_eq!(response.error_status_enum(), ErrorStatus::NoAccess);
    assert_eq!(response.error_index, 1);
    assert_eq!(agent.agent().mib().get(&test_count()), Some(Value::Integer(0)));
}

// =============================================================================
// SET
// =============================================================================

#[tokio::test]
async fn test_set_then_get() {
    let agent = TestAgent::new().await;
    let manager = Manager::new(agent.addr()).await;

    for n in 1..=3 {
        let response = manager
            .set(COMMUNITY_RW, vec![VarBind::new(test_count(), Value::Integer(n))])
            .await;
        assert_eq!(response.error_status, 0);
        assert_eq!(response.varbinds[0].value, Value::Integer(n));
    }

    let response = manager.get(COMMUNITY_RO, &[test_count()]).await;
    assert_eq!(response.varbinds[0].value, Value::Integer(3));
}

#[tokio::test]
async fn test_set_errors() {
    let agent = TestAgent::new().await;
    let manager = Manager::new(agent.addr()).await;

    let cases = [
        (test_description(), Value::from("new"), ErrorStatus::NotWritable),
        (test_count(), Value::from("three"), ErrorStatus::WrongType),
        (test_level(), Value::Integer(11), ErrorStatus::WrongValue),
        (nonexistent_oid(), Value::Integer(1), ErrorStatus::NotWritable),
    ];
    for (oid, value, expected) in cases {
        let response = manager
            .set(COMMUNITY_RW, vec![VarBind::new(oid.clone(), value)])
            .await;
        assert_eq!(response.error_status_enum(), expected, "SET {}", oid);
        assert_eq!(response.error_index, 1);
    }

    // v1 folds the v2 error codes onto its smaller set
    let response = manager
        .request(
            Version::V1,
            COMMUNITY_RW,
            Pdu::set_request(5, vec![VarBind::new(test_level(), Value::Integer(11))]),
        )
        .await
        .unwrap();
    assert_eq!(response.error_status_enum(), ErrorStatus::BadValue);
}

#[tokio::test]
async fn test_set_is_atomic() {
    let agent = TestAgent::new().await;
    let manager = Manager::new(agent.addr()).await;

    let response = manager
        .set(
            COMMUNITY_RW,
            vec![
                VarBind::new(test_count(), Value::Integer(40)),
                VarBind::new(test_level(), Value::Integer(99)),
                VarBind::new(test_level(), Value::Integer(1)),
            ],
        )
        .await;

    assert_eq!(response.error_status_enum(), ErrorStatus::WrongValue);
    assert_eq!(response.error_index, 2);

    let mib = agent.agent().mib();
    assert_eq!(mib.get(&test_count()), Some(Value::Integer(0)));
    assert_eq!(mib.get(&test_level()), Some(Value::Integer(5)));
}

#[tokio::test]
async fn test_commit_failure_rolls_back() {
    let writes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&writes);
    let agent = TestAgent::with_builder(move |b| {
        b.object(
            oid!(1, 3, 6, 1, 4, 1, 99999, 4, 0),
            ManagedObject::read_write(
                Syntax::Integer,
                || Value::Integer(0),
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SetResult::ResourceUnavailable)
                },
            ),
        )
    })
    .await;
    let manager = Manager::new(agent.addr()).await;

    let response = manager
        .set(
            COMMUNITY_RW,
            vec![
                VarBind::new(test_count(), Value::Integer(8)),
                VarBind::new(oid!(1, 3, 6, 1, 4, 1, 99999, 4, 0), Value::Integer(1)),
            ],
        )
        .await;

    assert_eq!(response.error_status_enum(), ErrorStatus::CommitFailed);
    assert_eq!(response.error_index, 2);
    assert_eq!(writes.load(Ordering::SeqCst), 1);
    assert_eq!(agent.agent().mib().get(&test_count()), Some(Value::Integer(0)));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_are_not_lost() {
    let agent = TestAgent::start(
        demo::install(snmp_mib_agent::Agent::builder(), 0).read_community(COMMUNITY_RO),
    )
    .await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let agent = agent.agent().clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..250 {
                agent
                    .mib()
                    .update(&demo::test_count(), |v| {
                        Value::Integer(v.as_i32().unwrap_or(0) + 1)
                    })
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let manager = Manager::new(agent.addr()).await;
    let response = manager
        .get(COMMUNITY_RO, &[demo::test_count(), demo::test_description()])
        .await;
    assert_eq!(response.varbinds[0].value, Value::Integer(2000));
    assert_eq!(response.varbinds[1].value, Value::from("My Description [2000]"));
}

// =============================================================================
// Malformed Input
// =============================================================================

#[tokio::test]
async fn test_malformed_datagrams_dropped() {
    let agent = TestAgent::new().await;
    let manager = Manager::new(agent.addr()).await;

    manager.send_raw(&[0x30, 0x03, 0x02, 0x01]).await;
    assert!(manager.recv_raw(Duration::from_millis(200)).await.is_none());

    // version 3 is not served
    let mut v3 = Message::v2c(COMMUNITY_RO, Pdu::get_request(1, &[test_count()]))
        .encode()
        .unwrap()
        .to_vec();
    assert_eq!(&v3[2..5], &[0x02, 0x01, 0x01]);
    v3[4] = 0x03;
    manager.send_raw(&v3).await;
    assert!(manager.recv_raw(Duration::from_millis(200)).await.is_none());

    // the agent keeps serving afterwards
    let response = manager.get(COMMUNITY_RO, &[test_count()]).await;
    assert_eq!(response.error_status, 0);

    let stats = agent.agent().stats();
    assert_eq!(stats.in_pkts, 3);
    assert_eq!(stats.in_asn_parse_errs, 1);
    assert_eq!(stats.in_bad_versions, 1);
}

#[tokio::test]
async fn test_response_pdus_ignored() {
    let agent = TestAgent::new().await;
    let manager = Manager::new(agent.addr()).await;

    let stray = Pdu::get_request(1, &[test_count()]).to_response(vec![]);
    manager
        .send_raw(&Message::v2c(COMMUNITY_RO, stray).encode().unwrap())
        .await;
    assert!(manager.recv_raw(Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn test_stop_ends_run() {
    let agent = snmp_mib_agent::Agent::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .unwrap();
    let runner = agent.clone();
    let task = tokio::spawn(async move { runner.run().await });

    agent.stop();
    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("run did not return after stop")
        .unwrap();
    assert!(result.is_ok());
}
