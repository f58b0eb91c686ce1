use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::json;

use fixturist_core::Datamodel;
use fixturist_generate::{MemoryClient, SeedEngine, SeedError, SeedOptions, SeedOutput};
use fixturist_introspect::{JsonFileProvider, SchemaProvider};
use fixturist_plan::{SeedPlan, load_plan};

fn golden(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/golden").join(name)
}

async fn blog_datamodel() -> Result<Datamodel> {
    Ok(JsonFileProvider::new(golden("blog.datamodel.json"))
        .datamodel()
        .await?)
}

#[tokio::test]
async fn golden_plan_seeds_every_model() -> Result<()> {
    let datamodel = blog_datamodel().await?;
    let plan = load_plan(golden("seed.plan.json"))?;
    let client = MemoryClient::new(&datamodel);
    let engine = SeedEngine::new(SeedOptions {
        seed: 1,
        ..SeedOptions::default()
    });

    let result = engine.run_plan(&client, &datamodel, &plan).await?;

    assert_eq!(result.report.seed, 42);
    assert_eq!(result.report.schema_fingerprint, datamodel.fingerprint()?);
    let order: Vec<&str> = result.report.models.iter().map(|m| m.model.as_str()).collect();
    assert_eq!(order, ["House", "User", "Pet"]);
    assert!(result.report.models.iter().all(|m| m.requested == 3 && m.created == 3));

    let SeedOutput::Fixtures(fixtures) = &result.output else {
        panic!("plan asks for fixtures output");
    };
    assert_eq!(fixtures.len(), 9);
    for (index, fixture) in fixtures.iter().enumerate() {
        assert_eq!(fixture.order, index as u64);
    }
    for user in fixtures.iter().filter(|f| f.model == "User") {
        let email = user.seed["email"].as_str().expect("email string");
        assert!(email.contains('@'));
        assert!(matches!(user.seed["role"].as_str(), Some("ADMIN" | "MEMBER")));
    }
    for pet in fixtures.iter().filter(|f| f.model == "Pet") {
        assert_eq!(pet.seed["animal"], json!("Dog"));
    }

    for pool in &result.report.pool_remaining {
        assert_eq!(pool.inserted, pool.consumed + pool.remaining);
    }
    Ok(())
}

#[tokio::test]
async fn plan_amounts_beyond_available_parents_are_rejected() -> Result<()> {
    let datamodel = blog_datamodel().await?;
    let plan = SeedPlan::from_json_str(
        r#"{
            "plan_version": "0.1",
            "models": { "*": { "amount": 3 }, "User": { "amount": 5 } }
        }"#,
    )?;
    let client = MemoryClient::new(&datamodel);

    let err = SeedEngine::default()
        .run_plan(&client, &datamodel, &plan)
        .await
        .expect_err("five users cannot share three houses");

    let errors = match err {
        SeedError::Aggregate(errors) => errors,
        other => panic!("both sides of the house relation are short, got {other}"),
    };
    assert!(errors.iter().any(|err| matches!(
        err,
        SeedError::InsufficientRelationInstances { model, field, required: 5, available: 3, .. }
            if model == "User" && field == "house"
    )));
    assert!(errors.iter().any(|err| matches!(
        err,
        SeedError::InsufficientRelationInstances { model, field, .. }
            if model == "House" && field == "owner"
    )));
    assert!(client.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn semantic_plan_errors_stop_the_run() -> Result<()> {
    let datamodel = blog_datamodel().await?;
    let plan = SeedPlan::from_json_str(
        r#"{ "plan_version": "0.1", "models": { "Ghost": { "amount": 1 } } }"#,
    )?;
    let client = MemoryClient::new(&datamodel);

    let err = SeedEngine::default()
        .run_plan(&client, &datamodel, &plan)
        .await
        .expect_err("unknown model");

    assert!(matches!(err, SeedError::InvalidPlan(ref message) if message.contains("unknown_model")));
    assert!(client.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn engine_defaults_apply_without_plan_options() -> Result<()> {
    let datamodel = blog_datamodel().await?;
    let plan = SeedPlan::from_json_str(r#"{ "plan_version": "0.1", "models": { "*": { "amount": 2 } } }"#)?;
    let client = MemoryClient::new(&datamodel);

    let result = SeedEngine::new(SeedOptions {
        seed: 9,
        ..SeedOptions::default()
    })
    .run_plan(&client, &datamodel, &plan)
    .await?;

    assert_eq!(result.report.seed, 9);
    let grouped = result.output.grouped().expect("grouped by default");
    assert_eq!(grouped.keys().map(String::as_str).collect::<Vec<_>>(), ["House", "Pet", "User"]);
    assert!(grouped.values().all(|records| records.len() == 2));
    Ok(())
}
