//! Integration tests for signup and the invitation workflow against
//! in-memory SurrealDB repositories.

use std::sync::Arc;

use crewkit_collab::{
    EventBus, InvitationService, InviteOutcome, LogNotifier, MembershipService, PlanLimits,
    SignupInput, SignupOutcome, SignupPolicy, SignupService,
};
use crewkit_core::error::CollabError;
use crewkit_core::models::company::MemberStatus;
use crewkit_core::models::invitation::{CreateInvitation, InvitationStatus};
use crewkit_core::models::user::Role;
use crewkit_core::repository::{CompanyRepository, InvitationRepository, UserRepository};
use crewkit_db::repository::{
    SurrealCompanyRepository, SurrealInvitationRepository, SurrealProjectRepository,
    SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

struct Fixture {
    db: Surreal<Db>,
    signup: SignupService<
        SurrealCompanyRepository<Db>,
        SurrealUserRepository<Db>,
        SurrealInvitationRepository<Db>,
    >,
    invitations: InvitationService<
        SurrealInvitationRepository<Db>,
        SurrealProjectRepository<Db>,
        SurrealUserRepository<Db>,
        LogNotifier,
    >,
    membership: MembershipService<
        SurrealCompanyRepository<Db>,
        SurrealProjectRepository<Db>,
        SurrealUserRepository<Db>,
    >,
}

/// Helper: in-memory DB, migrations, all services wired together.
async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    crewkit_db::run_migrations(&db).await.unwrap();

    let signup = SignupService::new(
        SurrealCompanyRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        SurrealInvitationRepository::new(db.clone()),
        SignupPolicy::default(),
    );
    let invitations = InvitationService::new(
        SurrealInvitationRepository::new(db.clone()),
        SurrealProjectRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        LogNotifier,
    );
    let membership = MembershipService::new(
        SurrealCompanyRepository::new(db.clone()),
        SurrealProjectRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        Arc::new(EventBus::default()),
        PlanLimits::default(),
    );
    Fixture {
        db,
        signup,
        invitations,
        membership,
    }
}

fn alice(company_name: &str) -> SignupInput {
    SignupInput {
        first_name: "Alice".into(),
        last_name: "Mason".into(),
        email: "alice@acme.com".into(),
        password: "correct horse".into(),
        company_name: Some(company_name.into()),
    }
}

fn bob() -> SignupInput {
    SignupInput {
        first_name: "Bob".into(),
        last_name: "Granger".into(),
        email: "bob@example.com".into(),
        password: "battery staple".into(),
        company_name: None,
    }
}

#[tokio::test]
async fn founder_signup_creates_company_and_admin() {
    let fx = setup().await;

    let outcome = fx.signup.signup(alice("Acme Construction")).await.unwrap();
    let SignupOutcome::FoundedCompany { user, company } = outcome else {
        panic!("expected a founded company");
    };

    assert_eq!(user.role, Role::Admin);
    assert_eq!(user.company_id, Some(company.id));
    assert_eq!(company.name, "Acme Construction");
    assert!(!company.premium);

    // The founder is in the member ledger.
    assert_eq!(company.members.len(), 1);
    assert_eq!(company.members[0].user_id, user.id);
    assert_eq!(company.members[0].role, Role::Admin);
    assert_eq!(company.members[0].status, MemberStatus::Active);

    // The password is stored hashed.
    assert!(user.password_hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn signup_enforces_the_password_policy() {
    let fx = setup().await;

    let mut input = alice("Acme");
    input.password = "short".into();
    let err = fx.signup.signup(input).await.unwrap_err();
    assert!(matches!(err, CollabError::Validation { .. }));
}

#[tokio::test]
async fn founder_signup_requires_a_company_name() {
    let fx = setup().await;

    let mut input = alice("Acme");
    input.company_name = None;
    let err = fx.signup.signup(input).await.unwrap_err();
    assert!(matches!(err, CollabError::Validation { .. }));
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let fx = setup().await;

    fx.signup.signup(alice("Acme")).await.unwrap();

    let mut again = alice("Another Co");
    again.email = " ALICE@acme.com ".into();
    let err = fx.signup.signup(again).await.unwrap_err();
    assert!(matches!(err, CollabError::Conflict { .. }));
}

#[tokio::test]
async fn duplicate_company_name_leaves_no_partial_state() {
    let fx = setup().await;

    fx.signup.signup(alice("Acme Construction")).await.unwrap();

    let mut rival = bob();
    rival.company_name = Some(" acme construction ".into());
    let err = fx.signup.signup(rival).await.unwrap_err();
    assert!(matches!(err, CollabError::Conflict { .. }));

    // The losing signup created no user.
    let users = SurrealUserRepository::new(fx.db.clone());
    assert!(
        users
            .find_by_email("bob@example.com")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn concurrent_founder_signups_race_at_the_name_index() {
    let fx = setup().await;

    let mut rival = bob();
    rival.company_name = Some(" ACME Construction ".into());

    // Neither signup sees the other's company before writing; the
    // UNIQUE name index decides the race.
    let (first, second) = tokio::join!(
        fx.signup.signup(alice("Acme Construction")),
        fx.signup.signup(rival),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    let err = outcomes.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(err, CollabError::Conflict { .. }));

    // Only the winner's user row exists afterwards.
    let users = SurrealUserRepository::new(fx.db.clone());
    let alice_row = users.find_by_email("alice@acme.com").await.unwrap();
    let bob_row = users.find_by_email("bob@example.com").await.unwrap();
    assert_eq!(
        alice_row.is_some() as usize + bob_row.is_some() as usize,
        1
    );
}

#[tokio::test]
async fn aborted_invited_signup_rolls_back_the_user() {
    let fx = setup().await;

    // A stale invitation pointing at a company that no longer exists.
    let invitations = SurrealInvitationRepository::new(fx.db.clone());
    invitations
        .create(CreateInvitation {
            project_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            email: "bob@example.com".into(),
            role: Role::Member,
        })
        .await
        .unwrap();

    let err = fx.signup.signup(bob()).await.unwrap_err();
    assert!(matches!(err, CollabError::NotFound { .. }));

    // The half-created user was deleted again, so the signup can be
    // retried once the invitation is cleaned up.
    let users = SurrealUserRepository::new(fx.db.clone());
    assert!(
        users
            .find_by_email("bob@example.com")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn invited_signup_joins_the_inviting_company() {
    let fx = setup().await;

    // Alice founds Acme and creates the Tower project.
    let outcome = fx.signup.signup(alice("Acme Construction")).await.unwrap();
    let SignupOutcome::FoundedCompany { user: owner, company } = outcome else {
        panic!("expected a founded company");
    };
    let project = fx
        .membership
        .create_project(company.id, owner.id, "Tower")
        .await
        .unwrap();

    // Bob has no account yet: the invite stays pending.
    let outcome = fx
        .invitations
        .invite(project.id, "Bob@Example.com", Role::Member)
        .await
        .unwrap();
    let InviteOutcome::Invited(invitation) = outcome else {
        panic!("expected a pending invitation");
    };
    assert_eq!(invitation.status, InvitationStatus::Pending);
    assert_eq!(invitation.company_id, company.id);

    // Bob signs up with the invited address and needs no company name.
    let outcome = fx.signup.signup(bob()).await.unwrap();
    let SignupOutcome::JoinedCompany { user, invitation } = outcome else {
        panic!("expected an invitation-based signup");
    };
    assert_eq!(user.company_id, Some(company.id));
    assert_eq!(user.role, Role::Member);

    // The invitation is resolved exactly once.
    let invitations = SurrealInvitationRepository::new(fx.db.clone());
    let stored = invitations.get_by_id(invitation.id).await.unwrap();
    assert_eq!(stored.status, InvitationStatus::Accepted);

    // Bob is in Acme's member ledger.
    let company = SurrealCompanyRepository::new(fx.db.clone())
        .get_by_id(company.id)
        .await
        .unwrap();
    assert!(company.members.iter().any(|m| m.user_id == user.id));
}

#[tokio::test]
async fn inviting_an_existing_user_adds_them_directly() {
    let fx = setup().await;

    let outcome = fx.signup.signup(alice("Acme Construction")).await.unwrap();
    let SignupOutcome::FoundedCompany { user: owner, company } = outcome else {
        panic!("expected a founded company");
    };
    let project = fx
        .membership
        .create_project(company.id, owner.id, "Tower")
        .await
        .unwrap();

    // Bob already has an account (he founded his own company).
    let mut bob_signup = bob();
    bob_signup.company_name = Some("Granger & Sons".into());
    let bob_user = fx.signup.signup(bob_signup).await.unwrap();

    let outcome = fx
        .invitations
        .invite(project.id, "bob@example.com", Role::Member)
        .await
        .unwrap();
    let InviteOutcome::AlreadyMember { user, project } = outcome else {
        panic!("expected a direct add");
    };
    assert_eq!(user.id, bob_user.user().id);
    assert!(project.member_ids.contains(&user.id));

    // No invitation row was recorded.
    let invitations = SurrealInvitationRepository::new(fx.db.clone());
    assert!(
        invitations
            .list_by_project(project.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn declined_invitations_do_not_resolve_at_signup() {
    let fx = setup().await;

    let outcome = fx.signup.signup(alice("Acme Construction")).await.unwrap();
    let SignupOutcome::FoundedCompany { user: owner, company } = outcome else {
        panic!("expected a founded company");
    };
    let project = fx
        .membership
        .create_project(company.id, owner.id, "Tower")
        .await
        .unwrap();

    let outcome = fx
        .invitations
        .invite(project.id, "bob@example.com", Role::Member)
        .await
        .unwrap();
    let InviteOutcome::Invited(invitation) = outcome else {
        panic!("expected a pending invitation");
    };

    fx.invitations.decline(invitation.id).await.unwrap();

    // A second decline is a conflict.
    let err = fx.invitations.decline(invitation.id).await.unwrap_err();
    assert!(matches!(err, CollabError::Conflict { .. }));

    // With the invitation declined, Bob must found a company.
    let err = fx.signup.signup(bob()).await.unwrap_err();
    assert!(matches!(err, CollabError::Validation { .. }));
}

#[tokio::test]
async fn oldest_pending_invitation_wins() {
    let fx = setup().await;

    // Two companies invite the same address.
    let first = fx.signup.signup(alice("Acme Construction")).await.unwrap();
    let SignupOutcome::FoundedCompany { user: alice_user, company: acme } = first else {
        panic!("expected a founded company");
    };
    let mut carol = bob();
    carol.email = "carol@rival.com".into();
    carol.company_name = Some("Rival Works".into());
    let second = fx.signup.signup(carol).await.unwrap();
    let SignupOutcome::FoundedCompany { user: carol_user, company: rival } = second else {
        panic!("expected a founded company");
    };

    let acme_project = fx
        .membership
        .create_project(acme.id, alice_user.id, "Tower")
        .await
        .unwrap();
    let rival_project = fx
        .membership
        .create_project(rival.id, carol_user.id, "Bridge")
        .await
        .unwrap();

    fx.invitations
        .invite(acme_project.id, "bob@example.com", Role::Member)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    fx.invitations
        .invite(rival_project.id, "bob@example.com", Role::Admin)
        .await
        .unwrap();

    // Bob joins the company that invited him first.
    let outcome = fx.signup.signup(bob()).await.unwrap();
    let SignupOutcome::JoinedCompany { user, invitation } = outcome else {
        panic!("expected an invitation-based signup");
    };
    assert_eq!(invitation.company_id, acme.id);
    assert_eq!(user.company_id, Some(acme.id));
    assert_eq!(user.role, Role::Member);
}

#[tokio::test]
async fn invite_requires_an_existing_project() {
    let fx = setup().await;

    let err = fx
        .invitations
        .invite(Uuid::new_v4(), "bob@example.com", Role::Member)
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::NotFound { .. }));
}
