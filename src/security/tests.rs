// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{DefaultPermissionChecker, PermissionChecker, PermissionType, Principal, Subject};
use crate::error::ErrorKind;
use crate::repository::{Permission, Repository};

fn repository() -> Repository {
    Repository::builder()
        .name("hitchhiker")
        .backend("git")
        .permissions(vec![
            Permission::user("ford", PermissionType::Write),
            Permission::group("vogons", PermissionType::Read),
        ])
        .build()
}

fn user(name: &str) -> Subject {
    Subject::authenticated(Principal::new(name))
}

#[test]
fn test_permission_ordering() {
    assert!(PermissionType::Owner.implies(PermissionType::Write));
    assert!(PermissionType::Write.implies(PermissionType::Read));
    assert!(!PermissionType::Read.implies(PermissionType::Write));
    assert_eq!("owner".parse::<PermissionType>(), Ok(PermissionType::Owner));
    assert!("admin".parse::<PermissionType>().is_err());
}

#[test]
fn test_user_entry_grants_weaker_permissions() {
    let checker = DefaultPermissionChecker::new();
    let repo = repository();
    let ford = user("ford");

    assert!(checker.has_permission(&ford, &repo, PermissionType::Read));
    assert!(checker.has_permission(&ford, &repo, PermissionType::Write));
    assert!(!checker.has_permission(&ford, &repo, PermissionType::Owner));
}

#[test]
fn test_group_entry() {
    let checker = DefaultPermissionChecker::new();
    let repo = repository();
    let jeltz = Subject::authenticated(
        Principal::new("jeltz").with_groups(vec!["vogons".to_string()]),
    );

    assert!(checker.has_permission(&jeltz, &repo, PermissionType::Read));
    assert!(!checker.has_permission(&jeltz, &repo, PermissionType::Write));
    // group entries do not match users of the same name
    assert!(!checker.has_permission(&user("vogons"), &repo, PermissionType::Read));
}

#[test]
fn test_admin_holds_everything() {
    let checker = DefaultPermissionChecker::new();
    let admin = Subject::authenticated(Principal::new("zaphod").with_admin(true));
    assert!(checker.has_permission(&admin, &repository(), PermissionType::Owner));
    assert!(checker.check_admin(&admin).is_ok());
}

#[test]
fn test_public_repository_and_anonymous_access() {
    let mut repo = repository();
    repo.public_readable = true;

    let strict = DefaultPermissionChecker::new();
    let open = DefaultPermissionChecker::new().with_anonymous_access(true);
    let anonymous = Subject::anonymous();

    assert!(strict.has_permission(&user("arthur"), &repo, PermissionType::Read));
    assert!(!strict.has_permission(&user("arthur"), &repo, PermissionType::Write));
    assert!(!strict.has_permission(&anonymous, &repo, PermissionType::Read));
    assert!(open.has_permission(&anonymous, &repo, PermissionType::Read));
    assert!(!open.has_permission(&anonymous, &repo, PermissionType::Write));
}

#[test]
fn test_check_reports_denial() {
    let checker = DefaultPermissionChecker::new();
    let err = checker
        .check(&user("arthur"), &repository(), PermissionType::Read)
        .unwrap_err();
    assert!(err.is(ErrorKind::PermissionDenied));
    insta::assert_snapshot!(
        err.to_string(),
        @"security error: user 'arthur' has no read permission on 'git/hitchhiker'"
    );

    let err = checker.check_admin(&Subject::anonymous()).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"security error: user 'anonymous' is not an administrator");
}

#[test]
fn test_scope_nests() {
    let outer = user("arthur");
    let inner = user("trillian");
    outer.scope(|| {
        inner.scope(|| assert_eq!(Subject::current().name(), "trillian"));
        assert_eq!(Subject::current().name(), "arthur");
    });
    assert_eq!(Subject::current(), Subject::anonymous());
}
