// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::{Arc, Mutex};

use super::WorkerPool;
use crate::security::{Principal, Subject};

#[test]
fn test_jobs_run_on_named_threads_with_subject() {
    let pool = WorkerPool::new("hook", 2).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for _ in 0..4 {
        let seen = Arc::clone(&seen);
        let subject = Subject::authenticated(Principal::new("marvin"));
        pool.submit_as(subject, move || {
            let thread = std::thread::current().name().unwrap_or_default().to_string();
            seen.lock().unwrap().push((thread, Subject::current().name().to_string()));
        })
        .unwrap();
    }
    pool.shutdown();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    for (thread, user) in seen.iter() {
        assert!(thread.starts_with("hook-"), "unexpected thread {thread}");
        assert_eq!(user, "marvin");
    }
    assert_eq!(pool.pending(), 0);
}

#[test]
fn test_submit_after_shutdown_fails() {
    let pool = WorkerPool::new("events", 1).unwrap();
    pool.shutdown();
    let err = pool.submit_as(Subject::anonymous(), || {}).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"hook error: worker pool 'events' is shut down");
}

#[test]
fn test_panicking_job_does_not_kill_worker() {
    let pool = WorkerPool::new("hook", 1).unwrap();
    let ran = Arc::new(Mutex::new(false));

    pool.submit_as(Subject::anonymous(), || panic!("boom"))
        .unwrap();
    let flag = Arc::clone(&ran);
    pool.submit_as(Subject::anonymous(), move || *flag.lock().unwrap() = true)
        .unwrap();
    pool.shutdown();

    assert!(*ran.lock().unwrap());
}

#[test]
fn test_subject_binding_is_restored() {
    assert!(!Subject::current().is_authenticated());
    let subject = Subject::authenticated(Principal::new("slartibartfast"));
    subject.scope(|| assert_eq!(Subject::current().name(), "slartibartfast"));
    assert!(!Subject::current().is_authenticated());
}
