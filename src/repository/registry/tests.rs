// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use super::*;
use crate::error::{ErrorKind, HookError};
use crate::event::{Delivery, EventBus};
use crate::hook::FnHook;
use crate::pool::WorkerPool;
use crate::repository::store::MemoryStore;
use crate::security::DefaultPermissionChecker;
use crate::test_utils::{MockHandler, MockState, admin, repository, repository_with, user};

struct Fixture {
    registry: RepositoryRegistry,
    state: Arc<MockState>,
    store: Arc<MemoryStore>,
    root: TempDir,
}

fn fixture() -> Fixture {
    fixture_with(|registry| registry)
}

fn fixture_with(configure: impl FnOnce(RepositoryRegistry) -> RepositoryRegistry) -> Fixture {
    let root = TempDir::new().unwrap();
    let handler = MockHandler::new(root.path().join("mock"));
    let state = Arc::clone(&handler.state);
    let backends = Arc::new(BackendRegistry::new());
    backends.register(Arc::new(handler)).unwrap();
    let store = Arc::new(MemoryStore::new());
    let registry = RepositoryRegistry::new(
        store.clone(),
        backends,
        Arc::new(DefaultPermissionChecker::new()),
    );
    Fixture {
        registry: configure(registry),
        state,
        store,
        root,
    }
}

/// Records `KIND name` for every event it sees.
fn recorder() -> (Arc<Mutex<Vec<String>>>, Arc<dyn RepositoryListener>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener = move |event: &RepositoryEvent| -> ScmResult<()> {
        sink.lock()
            .unwrap()
            .push(format!("{} {}", event.kind(), event.repository().name));
        Ok(())
    };
    let listener: Arc<dyn RepositoryListener> = Arc::new(listener);
    (seen, listener)
}

#[test]
fn test_create_assigns_identity_and_returns_copy() {
    let f = fixture();
    let mut input = repository("demo");
    input.id = "chosen-by-caller".to_string();

    let created = f.registry.create(&admin(), input, true).unwrap();
    assert_ne!(created.id, "chosen-by-caller");
    assert_eq!(created.id.len(), 32);
    assert!(created.creation_date.is_some());
    assert!(f.root.path().join("mock/demo").join(crate::test_utils::MARKER).is_file());

    let fetched = f
        .registry
        .get_by_name(&admin(), "mock", "demo")
        .unwrap()
        .unwrap();
    assert_eq!(fetched, created);

    // mutating a returned copy never reaches the store
    let mut copy = f.registry.get(&admin(), &created.id).unwrap().unwrap();
    copy.description = Some("tampered".to_string());
    let again = f.registry.get(&admin(), &created.id).unwrap().unwrap();
    assert_eq!(again.description, None);
}

#[test]
fn test_create_duplicate_leaves_store_untouched() {
    let f = fixture();
    let first = f.registry.create(&admin(), repository("demo"), true).unwrap();
    let err = f
        .registry
        .create(&admin(), repository("demo"), true)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    insta::assert_snapshot!(err.to_string(), @"repository error: repository 'mock/demo' already exists");
    assert_eq!(f.store.all().unwrap(), [first]);
    assert_eq!(f.state.storage_calls(), ["create demo"]);
}

#[test]
fn test_create_requires_admin_and_valid_input() {
    let f = fixture();
    let err = f
        .registry
        .create(&user("arthur"), repository("demo"), true)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let err = f
        .registry
        .create(&admin(), repository("-bad"), true)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut unknown = repository("demo");
    unknown.backend = "svn".to_string();
    let err = f.registry.create(&admin(), unknown, true).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"repository error: unknown repository type 'svn'");

    assert!(f.store.all().unwrap().is_empty());
    assert!(f.state.storage_calls().is_empty());
}

#[test]
fn test_create_storage_failure_registers_nothing() {
    let (seen, listener) = recorder();
    let f = fixture();
    f.registry.add_listener(listener);
    f.state.fail_create.store(true, Ordering::SeqCst);

    let err = f
        .registry
        .create(&admin(), repository("demo"), true)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendIo);
    assert!(f.store.all().unwrap().is_empty());
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_import_skips_provisioning() {
    let f = fixture();
    f.registry.import(&admin(), repository("legacy")).unwrap();
    assert!(f.state.storage_calls().is_empty());
    assert_eq!(f.store.all().unwrap().len(), 1);
}

#[test]
fn test_events_fire_in_pairs_and_in_order() {
    let (seen, listener) = recorder();
    let f = fixture();
    f.registry.add_listener(listener);

    let created = f.registry.create(&admin(), repository("demo"), true).unwrap();
    let mut changed = created.clone();
    changed.description = Some("Heart of Gold".to_string());
    f.registry.modify(&admin(), changed).unwrap();
    f.registry.delete(&admin(), &created).unwrap();

    insta::assert_snapshot!(seen.lock().unwrap().join("\n"), @r"
    BEFORE_CREATE demo
    CREATE demo
    BEFORE_MODIFY demo
    MODIFY demo
    BEFORE_DELETE demo
    DELETE demo
    ");
}

#[test]
fn test_failing_listener_does_not_stop_others() {
    let (seen, recorder) = recorder();
    let f = fixture();
    let failing =
        |_: &RepositoryEvent| -> ScmResult<()> { Err(crate::error::ScmError::other("boom")) };
    f.registry.add_listener(Arc::new(failing));
    f.registry.add_listener(recorder);

    let (created, logs) = crate::test_utils::capture_warnings(|| {
        f.registry.create(&admin(), repository("demo"), false)
    });
    assert!(created.is_ok());
    assert_eq!(seen.lock().unwrap().len(), 2);
    assert!(logs.contains("repository listener failed"));
}

#[test]
fn test_remove_listener() {
    let (seen, listener) = recorder();
    let f = fixture();
    f.registry.add_listener(Arc::clone(&listener));
    assert!(f.registry.remove_listener(&listener));
    assert!(!f.registry.remove_listener(&listener));

    f.registry.create(&admin(), repository("demo"), false).unwrap();
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_events_reach_event_channel() {
    let pool = Arc::new(WorkerPool::new("events", 1).unwrap());
    let bus = Arc::new(EventBus::new(pool));
    let labels = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&labels);
    bus.subscribe(
        Arc::new(move |event: &ScmEvent| -> ScmResult<()> {
            sink.lock().unwrap().push(event.label());
            Ok(())
        }),
        Delivery::Sync,
    );
    let f = fixture_with(|registry| registry.with_events(bus));

    f.registry.create(&admin(), repository("demo"), false).unwrap();
    assert_eq!(
        *labels.lock().unwrap(),
        ["BEFORE_CREATE mock/demo", "CREATE mock/demo"]
    );
}

#[test]
fn test_modify_checks_owner_on_stored_entity() {
    let f = fixture();
    let created = f
        .registry
        .create(&admin(), repository_with("demo", "arthur", PermissionType::Write), true)
        .unwrap();

    // a forged permission list in the submitted copy grants nothing
    let mut forged = created.clone();
    forged
        .permissions
        .push(crate::repository::Permission::user("arthur", PermissionType::Owner));
    let err = f.registry.modify(&user("arthur"), forged).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(f.store.get(&created.id).unwrap().unwrap(), created);
}

#[test]
fn test_modify_keeps_identity_and_stamps_last_modified() {
    let f = fixture();
    let created = f
        .registry
        .create(&admin(), repository_with("demo", "ford", PermissionType::Owner), true)
        .unwrap();

    let mut changed = repository_with("demo", "ford", PermissionType::Owner);
    changed.id = "other".to_string();
    changed.contact = Some("ford@hitchhiker.com".to_string());
    let modified = f.registry.modify(&user("ford"), changed).unwrap();

    assert_eq!(modified.id, created.id);
    assert_eq!(modified.creation_date, created.creation_date);
    assert!(modified.last_modified.is_some());
    assert_eq!(f.store.get(&created.id).unwrap().unwrap(), modified);
    assert_eq!(f.state.storage_calls(), ["create demo", "modify demo"]);
}

#[test]
fn test_modify_unknown_repository() {
    let f = fixture();
    let err = f.registry.modify(&admin(), repository("ghost")).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"repository error: repository 'mock/ghost' not found");
}

#[test]
fn test_delete_under_archive_policy() {
    let f = fixture_with(|registry| registry.with_archive_policy(true));
    let created = f.registry.create(&admin(), repository("demo"), true).unwrap();

    let err = f.registry.delete(&admin(), &created).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArchivePolicyViolation);
    insta::assert_snapshot!(err.to_string(), @"repository error: repository 'mock/demo' must be archived before it can be deleted");
    assert_eq!(f.state.storage_calls(), ["create demo"]);

    // the caller's copy claiming to be archived is not trusted
    let mut claimed = created.clone();
    claimed.archived = true;
    assert!(f.registry.delete(&admin(), &claimed).is_err());

    let archived = f.registry.archive(&admin(), &created.id, true).unwrap();
    assert!(archived.archived);
    f.registry.delete(&admin(), &archived).unwrap();
    assert!(f.store.all().unwrap().is_empty());
    assert!(!f.root.path().join("mock/demo").exists());
}

#[test]
fn test_delete_requires_owner() {
    let f = fixture();
    let created = f
        .registry
        .create(&admin(), repository_with("demo", "arthur", PermissionType::Write), true)
        .unwrap();
    let err = f.registry.delete(&user("arthur"), &created).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(f.state.storage_calls(), ["create demo"]);
}

#[test]
fn test_get_requires_read() {
    let f = fixture();
    let created = f.registry.create(&admin(), repository("secret"), false).unwrap();
    let err = f.registry.get(&user("arthur"), &created.id).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"security error: user 'arthur' has no read permission on 'mock/secret'");
    assert_eq!(f.registry.get(&user("arthur"), "missing").unwrap(), None);
}

#[test]
fn test_get_all_filters_orders_and_pages() {
    let f = fixture();
    for name in ["c", "a", "d", "b"] {
        f.registry
            .create(&admin(), repository_with(name, "arthur", PermissionType::Read), false)
            .unwrap();
    }
    f.registry.create(&admin(), repository("hidden"), false).unwrap();

    let names = |repositories: Vec<Repository>| -> Vec<String> {
        repositories.into_iter().map(|r| r.name).collect()
    };
    let arthur = user("arthur");
    assert_eq!(
        names(f.registry.get_all(&arthur, RepositoryOrder::Name, 0, None).unwrap()),
        ["a", "b", "c", "d"]
    );
    assert_eq!(
        names(f.registry.get_all(&arthur, RepositoryOrder::Name, 1, Some(2)).unwrap()),
        ["b", "c"]
    );
    assert_eq!(f.registry.get_all(&admin(), RepositoryOrder::Name, 0, None).unwrap().len(), 5);

    // the store keeps insertion order
    assert_eq!(f.store.all().unwrap()[0].name, "c");
}

#[test]
fn test_search_and_uri_lookup() {
    let f = fixture();
    for name in ["team", "team/api", "team/web", "other"] {
        f.registry.create(&admin(), repository(name), false).unwrap();
    }

    let found: Vec<String> = f
        .registry
        .search(&admin(), "team/*")
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(found, ["team/api", "team/web"]);
    assert_eq!(
        f.registry.search(&admin(), "[").unwrap_err().kind(),
        ErrorKind::Validation
    );

    let by_uri = |uri: &str| {
        f.registry
            .get_from_uri(&admin(), uri)
            .unwrap()
            .map(|r| r.name)
    };
    assert_eq!(by_uri("/mock/team/api/src/main.rs").as_deref(), Some("team/api"));
    assert_eq!(by_uri("mock/team/docs").as_deref(), Some("team"));
    assert_eq!(by_uri("mock/nothing"), None);
    assert_eq!(by_uri("svn/team"), None);
    assert_eq!(by_uri("mock"), None);
}

#[test]
fn test_refresh_and_types() {
    let f = fixture();
    let created = f.registry.create(&admin(), repository("demo"), false).unwrap();
    let mut stale = repository("demo");
    f.registry.refresh(&admin(), &mut stale).unwrap();
    assert_eq!(stale, created);

    assert_eq!(f.registry.types()[0].name(), "mock");
    assert_eq!(f.registry.configured_types().len(), 1);
    assert!(f.registry.last_modified().is_some());
    assert_eq!(
        f.registry.directory(&created).unwrap(),
        f.root.path().join("mock/demo")
    );
}

#[test]
fn test_middleware_can_adjust_and_veto() {
    struct Policy;

    impl RegistryMiddleware for Policy {
        fn create(&self, _subject: &Subject, repository: &mut Repository) -> ScmResult<()> {
            repository.public_readable = true;
            Ok(())
        }

        fn delete(&self, _subject: &Subject, repository: &Repository) -> ScmResult<()> {
            Err(RepositoryError::Validation {
                field: "name".to_string(),
                message: format!("'{}' is protected", repository.name),
            }
            .into())
        }
    }

    let f = fixture_with(|registry| registry.with_middleware(Arc::new(Policy)));
    let created = f.registry.create(&admin(), repository("demo"), true).unwrap();
    assert!(created.public_readable);

    let err = f.registry.delete(&admin(), &created).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"repository error: invalid repository field 'name': 'demo' is protected");
    assert_eq!(f.store.all().unwrap().len(), 1);
}

#[test]
fn test_unconfigured_handler_is_refused() {
    let root = TempDir::new().unwrap();
    let backends = Arc::new(BackendRegistry::new());
    backends
        .register(Arc::new(MockHandler::new(root.path()).unconfigured()))
        .unwrap();
    let registry = RepositoryRegistry::new(
        Arc::new(MemoryStore::new()),
        backends,
        Arc::new(DefaultPermissionChecker::new()),
    );

    let err = registry.create(&admin(), repository("demo"), true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(registry.configured_types().is_empty());
}

#[test]
fn test_receive_runs_pre_apply_post() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let pool = Arc::new(WorkerPool::new("hooks", 1).unwrap());
    let dispatcher = Arc::new(HookDispatcher::new(pool));
    for (name, hook_type) in [
        ("pre", RepositoryHookType::PreReceive),
        ("post", RepositoryHookType::PostReceive),
    ] {
        let sink = Arc::clone(&order);
        dispatcher.register(Arc::new(FnHook::new(name, vec![hook_type], move |event| {
            sink.lock()
                .unwrap()
                .push(format!("{name} as {}", Subject::current()));
            assert_eq!(event.subject().name(), "ford");
            Ok(())
        })));
    }
    let f = fixture_with(|registry| registry.with_hooks(dispatcher));
    let created = f
        .registry
        .create(&admin(), repository_with("demo", "ford", PermissionType::Write), false)
        .unwrap();

    let sink = Arc::clone(&order);
    let applied = f
        .registry
        .receive(&user("ford"), &created.id, Arc::new(HookContext::new(Vec::new())), |repository| {
            sink.lock().unwrap().push(format!("apply {}", repository.name));
            Ok(3)
        })
        .unwrap();

    assert_eq!(applied, 3);
    assert_eq!(
        *order.lock().unwrap(),
        ["pre as ford", "apply demo", "post as ford"]
    );
}

#[test]
fn test_receive_veto_skips_apply_and_post() {
    let post_ran = Arc::new(Mutex::new(false));
    let pool = Arc::new(WorkerPool::new("hooks", 1).unwrap());
    let dispatcher = Arc::new(HookDispatcher::new(pool));
    dispatcher.register(Arc::new(FnHook::new(
        "policy",
        vec![RepositoryHookType::PreReceive],
        |_| {
            Err(HookError::Rejected {
                hook: "policy".to_string(),
                message: "frozen".to_string(),
            }
            .into())
        },
    )));
    let flag = Arc::clone(&post_ran);
    dispatcher.register(Arc::new(FnHook::new(
        "notify",
        vec![RepositoryHookType::PostReceive],
        move |_| {
            *flag.lock().unwrap() = true;
            Ok(())
        },
    )));
    let f = fixture_with(|registry| registry.with_hooks(dispatcher));
    let created = f.registry.create(&admin(), repository("demo"), false).unwrap();

    let mut applied = false;
    let err = f
        .registry
        .receive(&admin(), &created.id, Arc::new(HookContext::new(Vec::new())), |_| {
            applied = true;
            Ok(())
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::HookRejected);
    assert!(!applied);
    assert!(!*post_ran.lock().unwrap());
}

#[test]
fn test_fire_hook_event_for_unknown_repository() {
    let f = fixture();
    let context = Arc::new(HookContext::new(Vec::new()));
    let err = f
        .registry
        .fire_hook_event(&admin(), "nope", RepositoryHookType::PreReceive, Arc::clone(&context))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = f
        .registry
        .fire_hook_event_by_name(&admin(), "mock", "nope", RepositoryHookType::PostReceive, context)
        .unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"repository error: repository 'mock/nope' not found");
}

#[test]
fn test_concurrent_creates_of_one_name() {
    let f = fixture();
    let registry = &f.registry;
    let results: Vec<bool> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| registry.create(&admin(), repository("race"), true).is_ok()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(results.iter().filter(|ok| **ok).count(), 1);
    assert_eq!(f.state.storage_calls(), ["create race"]);
}

#[test]
fn test_lock_table_only_holds_keys_in_use() {
    let f = fixture();
    let created = f
        .registry
        .create(&admin(), repository_with("demo", "arthur", PermissionType::Write), true)
        .unwrap();
    assert_eq!(f.registry.locks.len(), 0);

    // a refused caller never touches the table
    let err = f.registry.modify(&user("arthur"), created.clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(f.registry.locks.len(), 0);

    for round in 0..16 {
        let name = format!("churn-{round}");
        let created = f.registry.create(&admin(), repository(&name), true).unwrap();
        f.registry.archive(&admin(), &created.id, true).unwrap();
        f.registry.delete(&admin(), &created).unwrap();
    }
    assert_eq!(f.registry.locks.len(), 0);
}

#[test]
fn test_archive_keeps_concurrent_changes() {
    let f = fixture();
    let created = f.registry.create(&admin(), repository("demo"), true).unwrap();
    let registry = &f.registry;
    let id = created.id.as_str();

    for round in 0..32 {
        let contact = format!("round-{round}@earth.com");
        std::thread::scope(|scope| {
            scope.spawn(|| registry.archive(&admin(), id, round % 2 == 0).unwrap());
            scope.spawn(|| {
                let mut changed = registry.get(&admin(), id).unwrap().unwrap();
                changed.contact = Some(contact.clone());
                registry.modify(&admin(), changed).unwrap();
            });
        });
        let stored = f.store.get(id).unwrap().unwrap();
        assert_eq!(stored.contact.as_deref(), Some(contact.as_str()), "round {round}");
    }
}

#[test]
fn test_archive_requires_owner() {
    let f = fixture();
    let created = f
        .registry
        .create(&admin(), repository_with("demo", "arthur", PermissionType::Write), true)
        .unwrap();
    let err = f.registry.archive(&user("arthur"), &created.id, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert!(!f.store.get(&created.id).unwrap().unwrap().archived);

    let err = f.registry.archive(&admin(), "ghost", true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_get_by_location() {
    let f = fixture();
    let created = f.registry.create(&admin(), repository("secret"), true).unwrap();
    let directory = f.registry.directory(&created).unwrap();
    let base = f.root.path();

    let found = f
        .registry
        .get_by_location(&admin(), base, directory.to_str().unwrap(), PermissionType::Write)
        .unwrap();
    assert_eq!(found.map(|r| r.id), Some(created.id.clone()));

    let url = format!("file://{}", directory.display());
    let err = f
        .registry
        .get_by_location(&user("arthur"), base, &url, PermissionType::Read)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    // relative to the base, and outside every repository
    let relative = f
        .registry
        .get_by_location(&admin(), &base.join("mock"), "secret", PermissionType::Read)
        .unwrap();
    assert!(relative.is_some());
    for location in ["https://example.com/secret.git", ".", "/nonexistent/secret"] {
        let outside = f
            .registry
            .get_by_location(&user("arthur"), base, location, PermissionType::Read)
            .unwrap();
        assert!(outside.is_none(), "{location}");
    }
}
