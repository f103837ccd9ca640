//! End-to-end checks of the resolution properties.

use warden_core::{Clipboard, Grantee};
use warden_types::{Entity, RoleRef, Target};

mod common;
use common::{TestFixture, user};

#[tokio::test]
async fn test_forbid_beats_allow_regardless_of_grant_path() {
    let fixture = TestFixture::new();
    let alice = user(1);

    // Allowed directly, forbidden via a role.
    fixture.allow(alice.clone(), &["ban-users"]).await;
    fixture.forbid(Grantee::Role(RoleRef::from("restricted")), &["ban-users"]).await;
    fixture.assign("restricted", &alice).await;

    fixture.assert_cannot(&alice, "ban-users", None).await;

    // Allowed via a role, forbidden directly.
    let bob = user(2);
    fixture.allow(Grantee::Role(RoleRef::from("admin")), &["delete-users"]).await;
    fixture.assign("admin", &bob).await;
    fixture.forbid(bob.clone(), &["delete-users"]).await;

    fixture.assert_cannot(&bob, "delete-users", None).await;
}

#[tokio::test]
async fn test_wildcard_ability_subsumes_every_name_on_the_type() {
    let fixture = TestFixture::new();
    let alice = user(1);

    fixture
        .allow_targeted(alice.clone(), "*", Target::Entity(Entity::unsaved("posts")))
        .await;

    for ability in ["edit", "delete", "publish"] {
        for id in [1, 2, 99] {
            let post = Target::Entity(Entity::new("posts", id));
            fixture.assert_can(&alice, ability, Some(&post)).await;
        }
    }

    let other = Target::Entity(Entity::new("users", 5));
    fixture.assert_cannot(&alice, "edit", Some(&other)).await;
}

#[tokio::test]
async fn test_wildcard_subsumption_yields_to_forbids() {
    let fixture = TestFixture::new();
    let alice = user(1);

    fixture
        .allow_targeted(alice.clone(), "*", Target::Entity(Entity::unsaved("posts")))
        .await;
    fixture
        .allow_targeted(alice.clone(), "delete", Target::Entity(Entity::unsaved("posts")))
        .await;

    // Forbid one name on the type; the wildcard must not resurrect it.
    let forbid = warden_core::GivesAbilities::forbidding(
        fixture.store.clone(),
        vec![warden_core::AbilityGrant::for_target(
            "delete",
            Target::Entity(Entity::unsaved("posts")),
        )],
    );
    forbid.to(alice.clone()).await.unwrap();

    let post = Target::Entity(Entity::new("posts", 1));
    fixture.assert_can(&alice, "edit", Some(&post)).await;
    fixture.assert_cannot(&alice, "delete", Some(&post)).await;
}

#[tokio::test]
async fn test_ownership_suffix_grants_only_owned_instances() {
    // Alice owns posts whose id matches her own.
    let fixture = TestFixture::with_ownership(|authority: &Entity, target: &Entity| {
        target.kind == "posts" && target.id == authority.id
    });
    let alice = user(1);

    fixture
        .allow_owned(alice.clone(), "edit", Target::Entity(Entity::unsaved("posts")))
        .await;

    let owned = Target::Entity(Entity::new("posts", 1));
    let unowned = Target::Entity(Entity::new("posts", 2));

    fixture.assert_can(&alice, "edit", Some(&owned)).await;
    fixture.assert_cannot(&alice, "edit", Some(&unowned)).await;
}

#[tokio::test]
async fn test_forbidden_owned_grant_blocks_owned_instances() {
    let fixture = TestFixture::with_ownership(|authority: &Entity, target: &Entity| {
        target.kind == "posts" && target.id == authority.id
    });
    let alice = user(1);

    fixture
        .allow_targeted(alice.clone(), "edit", Target::Entity(Entity::unsaved("posts")))
        .await;

    let forbid = warden_core::GivesAbilities::forbidding(
        fixture.store.clone(),
        vec![
            warden_core::AbilityGrant::for_target(
                "edit",
                Target::Entity(Entity::unsaved("posts")),
            )
            .to_own(),
        ],
    );
    forbid.to(alice.clone()).await.unwrap();

    let owned = Target::Entity(Entity::new("posts", 1));
    let unowned = Target::Entity(Entity::new("posts", 2));

    fixture.assert_cannot(&alice, "edit", Some(&owned)).await;
    fixture.assert_can(&alice, "edit", Some(&unowned)).await;
}

#[tokio::test]
async fn test_everyone_grants_apply_to_every_authority() {
    let fixture = TestFixture::new();

    fixture.allow(Grantee::Everyone, &["browse"]).await;

    fixture.assert_can(&user(1), "browse", None).await;
    fixture.assert_can(&user(42), "browse", None).await;
    fixture.assert_cannot(&user(1), "ban-users", None).await;
}

#[tokio::test]
async fn test_simple_wildcard_matches_any_simple_ability() {
    let fixture = TestFixture::new();
    let alice = user(1);

    fixture.allow(alice.clone(), &["*"]).await;

    fixture.assert_can(&alice, "ban-users", None).await;
    fixture.assert_can(&alice, "anything-at-all", None).await;
}

#[tokio::test]
async fn test_check_get_id_reports_the_matched_grant() {
    let fixture = TestFixture::new();
    let alice = user(1);

    fixture.allow(alice.clone(), &["ban-users"]).await;

    let outcome = fixture
        .clipboard
        .check_get_id(&alice, "ban-users", None, None)
        .await
        .unwrap();
    assert!(outcome.is_allowed());
    assert!(outcome.ability_id().is_some());

    let missing = fixture
        .clipboard
        .check_get_id(&alice, "create-users", None, None)
        .await
        .unwrap();
    assert_eq!(missing.ability_id(), None);
}
