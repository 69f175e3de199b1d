// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::{Arc, Mutex};

use super::{Delivery, EventBus, EventChannel, ScmEvent};
use crate::error::ScmError;
use crate::pool::WorkerPool;
use crate::repository::{HandlerEvent, Repository, RepositoryEvent};
use crate::security::{Principal, Subject};

fn event(kind: HandlerEvent) -> ScmEvent {
    let repository = Repository::builder().name("demo").backend("git").build();
    ScmEvent::Repository(RepositoryEvent::new(
        kind,
        repository,
        None,
        Subject::authenticated(Principal::new("arthur")),
    ))
}

#[test]
fn test_sync_subscribers_run_in_order_despite_failures() {
    let pool = Arc::new(WorkerPool::new("events", 1).unwrap());
    let bus = EventBus::new(Arc::clone(&pool));
    let log = Arc::new(Mutex::new(Vec::new()));

    for name in ["first", "failing", "third"] {
        let log = Arc::clone(&log);
        bus.subscribe(
            Arc::new(move |_event: &ScmEvent| {
                log.lock().unwrap().push(name);
                if name == "failing" {
                    return Err(ScmError::other("subscriber failed"));
                }
                Ok(())
            }),
            Delivery::Sync,
        );
    }

    bus.publish(event(HandlerEvent::Create));
    assert_eq!(*log.lock().unwrap(), vec!["first", "failing", "third"]);
}

#[test]
fn test_async_subscriber_sees_publisher_identity() {
    let pool = Arc::new(WorkerPool::new("events", 1).unwrap());
    let bus = EventBus::new(Arc::clone(&pool));
    let seen = Arc::new(Mutex::new(None));

    let sink = Arc::clone(&seen);
    bus.subscribe(
        Arc::new(move |_event: &ScmEvent| {
            *sink.lock().unwrap() = Some(Subject::current().name().to_string());
            Ok(())
        }),
        Delivery::Async,
    );

    bus.publish(event(HandlerEvent::Delete));
    pool.shutdown();
    assert_eq!(seen.lock().unwrap().as_deref(), Some("arthur"));
}

#[test]
fn test_unsubscribe() {
    let pool = Arc::new(WorkerPool::new("events", 1).unwrap());
    let bus = EventBus::new(pool);
    let count = Arc::new(Mutex::new(0));

    let counter = Arc::clone(&count);
    let id = bus.subscribe(
        Arc::new(move |_event: &ScmEvent| {
            *counter.lock().unwrap() += 1;
            Ok(())
        }),
        Delivery::Sync,
    );

    bus.publish(event(HandlerEvent::Modify));
    assert!(bus.unsubscribe(id));
    assert!(!bus.unsubscribe(id));
    bus.publish(event(HandlerEvent::Modify));
    assert_eq!(*count.lock().unwrap(), 1);
}
