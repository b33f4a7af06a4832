//! Gateway-level semantics: close behavior, transactions, validation
//! surfacing through the repository.

use std::sync::Arc;

use asupersync::runtime::RuntimeBuilder;

use activerow::prelude::*;
use activerow_memory::MemoryConnection;

fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> std::result::Result<T, String> {
    match outcome {
        Outcome::Ok(v) => Ok(v),
        Outcome::Err(e) => Err(format!("unexpected error: {e}")),
        Outcome::Cancelled(r) => Err(format!("cancelled: {r:?}")),
        Outcome::Panicked(p) => Err(format!("panicked: {p:?}")),
    }
}

fn person() -> Arc<EntityDef> {
    EntityDef::builder("person")
        .field("name", FieldKind::ShortText { max_len: 30 })
        .field("bio", FieldKind::LongText)
        .field("age", FieldKind::Integer)
        .build()
        .expect("valid entity definition")
}

async fn save_ada(cx: &Cx, repo: &Repository<'_, MemoryConnection>) -> Record {
    let mut rec = repo.record();
    rec.set("name", "Ada").unwrap();
    rec.set("bio", "b").unwrap();
    rec.set("age", 30_i64).unwrap();
    unwrap_outcome(repo.save(cx, &mut rec).await).unwrap();
    rec
}

#[test]
fn closed_gateway_fails_every_operation() {
    let rt = RuntimeBuilder::current_thread().build().expect("runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MemoryConnection::open();
        let repo = unwrap_outcome(Repository::open(&cx, &conn, person()).await).unwrap();

        conn.clone().close(&cx).await.unwrap();
        conn.clone().close(&cx).await.unwrap(); // closing twice is fine

        assert!(matches!(
            repo.all(&cx).await,
            Outcome::Err(Error::Connection(_))
        ));
        assert!(matches!(
            repo.get(&cx, 1).await,
            Outcome::Err(Error::Connection(_))
        ));
        let mut rec = repo.record();
        rec.set("name", "Ada").unwrap();
        rec.set("bio", "b").unwrap();
        rec.set("age", 30_i64).unwrap();
        assert!(matches!(
            repo.save(&cx, &mut rec).await,
            Outcome::Err(Error::Connection(_))
        ));
    });
}

#[test]
fn transaction_scope_commits_or_discards() {
    let rt = RuntimeBuilder::current_thread().build().expect("runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MemoryConnection::open();
        let repo = unwrap_outcome(Repository::open(&cx, &conn, person()).await).unwrap();
        let rec = save_ada(&cx, &repo).await;
        let id = rec.id().unwrap();

        // rollback: the delete inside the scope is discarded
        let tx = unwrap_outcome(repo.transaction(&cx).await).unwrap();
        unwrap_outcome(
            tx.execute(
                &cx,
                "DELETE FROM \"person\" WHERE id = $1",
                &[Value::BigInt(id)],
            )
            .await,
        )
        .unwrap();
        unwrap_outcome(tx.rollback(&cx).await).unwrap();
        unwrap_outcome(repo.get(&cx, id).await).unwrap();

        // commit: the delete sticks
        let tx = unwrap_outcome(repo.transaction(&cx).await).unwrap();
        unwrap_outcome(
            tx.execute(
                &cx,
                "DELETE FROM \"person\" WHERE id = $1",
                &[Value::BigInt(id)],
            )
            .await,
        )
        .unwrap();
        unwrap_outcome(tx.commit(&cx).await).unwrap();
        assert!(matches!(
            repo.get(&cx, id).await,
            Outcome::Err(Error::NotFound(_))
        ));
    });
}

#[test]
fn validation_failures_never_reach_the_gateway() {
    let rt = RuntimeBuilder::current_thread().build().expect("runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MemoryConnection::open();
        let repo = unwrap_outcome(Repository::open(&cx, &conn, person()).await).unwrap();

        let mut rec = repo.record();
        // 31 characters against ShortText(30)
        assert!(matches!(
            rec.set("name", "x".repeat(31)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(rec.set("age", 1.5_f64), Err(Error::Validation(_))));
        assert!(matches!(rec.set("age", true), Err(Error::Validation(_))));

        // a partially-set record is refused before any SQL is built
        rec.set("name", "Ada").unwrap();
        assert!(matches!(
            repo.save(&cx, &mut rec).await,
            Outcome::Err(Error::Integrity(_))
        ));
        assert_eq!(rec.id(), None);
    });
}

#[test]
fn boundary_length_is_accepted() {
    let rt = RuntimeBuilder::current_thread().build().expect("runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MemoryConnection::open();
        let repo = unwrap_outcome(Repository::open(&cx, &conn, person()).await).unwrap();

        let mut rec = repo.record();
        rec.set("name", "x".repeat(30)).unwrap();
        rec.set("bio", "").unwrap();
        rec.set("age", 0_i64).unwrap();
        unwrap_outcome(repo.save(&cx, &mut rec).await).unwrap();

        let back = unwrap_outcome(repo.get(&cx, rec.id().unwrap()).await).unwrap();
        assert_eq!(back.get("name"), Some(&Value::Text("x".repeat(30))));
    });
}
