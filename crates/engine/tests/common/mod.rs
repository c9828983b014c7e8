#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{Account, Engine, NewTransaction, Role};
use migration::MigratorTrait;

pub const OWNER: &str = "olga";
pub const ADMIN: &str = "ada";
pub const TREASURER: &str = "tess";
pub const BOARD: &str = "bob";
pub const MEMBER: &str = "max";

/// Engine on a fresh in-memory database with one club whose members cover
/// every role.
pub async fn engine_with_club() -> (Engine, DatabaseConnection, String) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    let club_id = engine.new_club("Rowing Club", OWNER).await.unwrap();
    for (member, role) in [
        (ADMIN, Role::Admin),
        (TREASURER, Role::Treasurer),
        (BOARD, Role::Board),
        (MEMBER, Role::Member),
    ] {
        engine
            .set_member_role(&club_id, member, role, OWNER)
            .await
            .unwrap();
    }

    (engine, db, club_id)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

pub fn bank_line(
    sequence_number: &str,
    occurred_on: NaiveDate,
    amount_minor: i64,
    reconciled: bool,
) -> NewTransaction {
    NewTransaction {
        sequence_number: sequence_number.to_string(),
        occurred_on,
        amount_minor,
        account: Account::Current,
        counterparty: Some("Boathouse Ltd".to_string()),
        description: Some("membership fees".to_string()),
        reconciled,
    }
}

/// Store a bank line as the treasurer and return its id.
pub async fn import(
    engine: &Engine,
    club_id: &str,
    line: NewTransaction,
    created_at: DateTime<Utc>,
) -> uuid::Uuid {
    engine
        .add_transaction(club_id, line, TREASURER, created_at)
        .await
        .unwrap()
}
