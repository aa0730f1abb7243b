//! Integration tests for the Company repository using in-memory
//! SurrealDB.

use crewkit_core::error::CollabError;
use crewkit_core::models::company::{CompanyMember, CreateCompany, MemberStatus};
use crewkit_core::models::user::Role;
use crewkit_core::repository::CompanyRepository;
use crewkit_db::repository::SurrealCompanyRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    crewkit_db::run_migrations(&db).await.unwrap();
    db
}

#[tokio::test]
async fn create_and_get_company() {
    let db = setup().await;
    let repo = SurrealCompanyRepository::new(db);

    let company = repo
        .create(CreateCompany {
            name: "Acme Construction".into(),
        })
        .await
        .unwrap();

    assert_eq!(company.name, "Acme Construction");
    assert!(!company.premium);
    assert!(company.members.is_empty());

    let fetched = repo.get_by_id(company.id).await.unwrap();
    assert_eq!(fetched.id, company.id);
    assert_eq!(fetched.name, "Acme Construction");
}

#[tokio::test]
async fn missing_company_is_not_found() {
    let db = setup().await;
    let repo = SurrealCompanyRepository::new(db);

    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CollabError::NotFound { .. }));
}

#[tokio::test]
async fn company_name_is_unique_case_insensitive() {
    let db = setup().await;
    let repo = SurrealCompanyRepository::new(db);

    repo.create(CreateCompany {
        name: "Acme Construction".into(),
    })
    .await
    .unwrap();

    // Same name modulo case and surrounding whitespace.
    let err = repo
        .create(CreateCompany {
            name: "  ACME construction ".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::Conflict { .. }));
}

#[tokio::test]
async fn find_by_name_normalizes() {
    let db = setup().await;
    let repo = SurrealCompanyRepository::new(db);

    let company = repo
        .create(CreateCompany {
            name: "Acme Construction".into(),
        })
        .await
        .unwrap();

    let found = repo
        .find_by_name(" acme CONSTRUCTION ")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, company.id);

    assert!(repo.find_by_name("No Such Co").await.unwrap().is_none());
}

#[tokio::test]
async fn add_member_is_idempotent() {
    let db = setup().await;
    let repo = SurrealCompanyRepository::new(db);

    let company = repo
        .create(CreateCompany {
            name: "Acme".into(),
        })
        .await
        .unwrap();

    let user_id = Uuid::new_v4();
    let company = repo
        .add_member(
            company.id,
            CompanyMember {
                user_id,
                role: Role::Admin,
                status: MemberStatus::Active,
            },
        )
        .await
        .unwrap();
    assert_eq!(company.members.len(), 1);

    // Re-adding the same user, even with a different role, leaves the
    // existing entry untouched.
    let company = repo
        .add_member(
            company.id,
            CompanyMember {
                user_id,
                role: Role::Member,
                status: MemberStatus::Invited,
            },
        )
        .await
        .unwrap();
    assert_eq!(company.members.len(), 1);
    assert_eq!(company.members[0].role, Role::Admin);
    assert_eq!(company.members[0].status, MemberStatus::Active);
}

#[tokio::test]
async fn set_premium_flips_the_plan_gate() {
    let db = setup().await;
    let repo = SurrealCompanyRepository::new(db);

    let company = repo
        .create(CreateCompany {
            name: "Acme".into(),
        })
        .await
        .unwrap();
    assert!(!company.premium);

    let company = repo.set_premium(company.id).await.unwrap();
    assert!(company.premium);
}

#[tokio::test]
async fn delete_removes_the_company() {
    let db = setup().await;
    let repo = SurrealCompanyRepository::new(db);

    let company = repo
        .create(CreateCompany {
            name: "Short-lived".into(),
        })
        .await
        .unwrap();

    repo.delete(company.id).await.unwrap();
    let err = repo.get_by_id(company.id).await.unwrap_err();
    assert!(matches!(err, CollabError::NotFound { .. }));

    // The name becomes available again.
    repo.create(CreateCompany {
        name: "Short-lived".into(),
    })
    .await
    .unwrap();
}
