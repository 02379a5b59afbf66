// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::StateStore;

fn setup_org(store: &StateStore) -> (OrgId, TeamId) {
    let org_id = OrgId::new("org-1");
    let team_id = TeamId::new("team-1");
    store
        .insert_org(&Organization {
            id: org_id.clone(),
            name: "acme".to_string(),
            created_at_ms: 1_000,
        })
        .unwrap();
    store
        .insert_team(&Team {
            id: team_id.clone(),
            org_id: org_id.clone(),
            name: "platform".to_string(),
            created_at_ms: 1_000,
        })
        .unwrap();
    (org_id, team_id)
}

#[test]
fn duplicate_org_names_conflict() {
    let store = StateStore::open_in_memory().unwrap();
    setup_org(&store);
    let result = store.insert_org(&Organization {
        id: OrgId::new("org-2"),
        name: "acme".to_string(),
        created_at_ms: 2_000,
    });
    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[test]
fn memberships_upsert_roles() {
    let store = StateStore::open_in_memory().unwrap();
    let (org_id, team_id) = setup_org(&store);

    store
        .add_org_member(&OrgMember {
            org_id: org_id.clone(),
            uid: Uid::new("u-alice"),
            role: OrgRole::Member,
        })
        .unwrap();
    store
        .add_org_member(&OrgMember {
            org_id: org_id.clone(),
            uid: Uid::new("u-alice"),
            role: OrgRole::Owner,
        })
        .unwrap();

    let members = store.org_members(&org_id).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].role, OrgRole::Owner);

    store
        .add_team_member(&TeamMember {
            team_id: team_id.clone(),
            uid: Uid::new("u-alice"),
            role: OrgRole::Member,
        })
        .unwrap();
    assert_eq!(store.team_members(&team_id).unwrap().len(), 1);
}

#[test]
fn org_delete_cascades() {
    let store = StateStore::open_in_memory().unwrap();
    let (org_id, team_id) = setup_org(&store);
    store
        .add_org_member(&OrgMember {
            org_id: org_id.clone(),
            uid: Uid::new("u-alice"),
            role: OrgRole::Owner,
        })
        .unwrap();
    store
        .add_team_member(&TeamMember {
            team_id: team_id.clone(),
            uid: Uid::new("u-alice"),
            role: OrgRole::Member,
        })
        .unwrap();

    assert!(store.delete_org(&org_id).unwrap());
    assert!(store.get_org(&org_id).unwrap().is_none());
    assert!(store.list_teams(&org_id).unwrap().is_empty());
    assert!(store.org_members(&org_id).unwrap().is_empty());
    assert!(store.team_members(&team_id).unwrap().is_empty());
}
