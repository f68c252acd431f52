use crate::config::Config;
use crate::db::NewUser;
use crate::db::repositories::user::hash_password_blocking;
use crate::domain::{Actor, Role};
use crate::services::{AssetInput, AssetUpdate, LogInput};
use crate::state::SharedState;

const SAMPLE_LOG_DESCRIPTION: &str = "Battery replaced";

struct DemoUser {
    name: &'static str,
    email: &'static str,
    password: &'static str,
    role: Role,
}

const DEMO_USERS: [DemoUser; 3] = [
    DemoUser {
        name: "Admin User",
        email: "admin@example.com",
        password: "Admin@123",
        role: Role::Admin,
    },
    DemoUser {
        name: "Manager User",
        email: "manager@example.com",
        password: "Manager@123",
        role: Role::Manager,
    },
    DemoUser {
        name: "Tech User",
        email: "tech@example.com",
        password: "Tech@123",
        role: Role::Tech,
    },
];

/// Safe to run repeatedly: existing rows are refreshed, never duplicated.
pub async fn cmd_seed(config: Config) -> anyhow::Result<()> {
    let security = config.security.clone();
    let state = SharedState::new(config).await?;

    let mut actors = Vec::with_capacity(DEMO_USERS.len());
    for demo in &DEMO_USERS {
        let actor = upsert_user(&state, demo, &security).await?;
        println!("  user  {:<22} {:<8} id={}", demo.email, demo.role.as_str(), actor.id);
        actors.push(actor);
    }
    let [admin, manager, tech] = [actors[0], actors[1], actors[2]];

    let laptop = upsert_asset(
        &state,
        &admin,
        AssetInput {
            name: Some("Laptop A".to_string()),
            category: Some("Electronics".to_string()),
            location: Some("Delhi".to_string()),
            purchase_date: Some("2024-05-10".to_string()),
            warranty_end: Some("2026-05-10".to_string()),
            frequency_days: Some(180),
            assigned_user_id: Some(manager.id),
        },
    )
    .await?;

    upsert_asset(
        &state,
        &admin,
        AssetInput {
            name: Some("Printer B".to_string()),
            category: Some("Office".to_string()),
            location: Some("Mumbai".to_string()),
            purchase_date: Some("2023-03-15".to_string()),
            warranty_end: Some("2025-03-15".to_string()),
            frequency_days: Some(90),
            assigned_user_id: Some(tech.id),
        },
    )
    .await?;

    let has_sample = state
        .maintenance_service
        .list_for_asset(laptop)
        .await?
        .iter()
        .any(|log| log.description.as_deref() == Some(SAMPLE_LOG_DESCRIPTION));

    if !has_sample {
        let log = state
            .maintenance_service
            .create(
                &tech,
                laptop,
                LogInput {
                    description: Some(SAMPLE_LOG_DESCRIPTION.to_string()),
                    parts_used: Some("Battery".to_string()),
                    cost: Some(5000.0),
                    service_date: Some("2025-01-05".to_string()),
                    next_service_due: None,
                    attachment_path: None,
                },
            )
            .await?;
        println!("  log   #{} on asset {laptop}", log.id);
    }

    println!("✓ Seed complete.");
    Ok(())
}

async fn upsert_user(
    state: &SharedState,
    demo: &DemoUser,
    security: &crate::config::SecurityConfig,
) -> anyhow::Result<Actor> {
    let users = state.store.users();
    let hash = hash_password_blocking(demo.password.to_string(), security.clone()).await?;

    let user = match users.find_for_login(demo.email).await? {
        Some(existing) => {
            let user = users.set_role(existing, demo.role).await?;
            let user = users.set_active(user, true).await?;
            users
                .set_temp_password(user, hash, demo.password.to_string())
                .await?
        }
        None => {
            users
                .insert(NewUser {
                    name: demo.name.to_string(),
                    email: demo.email.to_string(),
                    username: None,
                    password_hash: hash,
                    role: demo.role,
                    must_change_password: true,
                    last_temp_password: None,
                })
                .await?
        }
    };

    Ok(Actor {
        id: user.id,
        role: user.role,
    })
}

/// Matches on name; returns the asset id.
async fn upsert_asset(
    state: &SharedState,
    admin: &Actor,
    input: AssetInput,
) -> anyhow::Result<i32> {
    let name = input.name.clone().unwrap_or_default();
    let existing = state
        .store
        .assets()
        .list_all()
        .await?
        .into_iter()
        .find(|a| a.name == name);

    let asset = match existing {
        Some(asset) => {
            state
                .asset_service
                .update(
                    admin,
                    asset.id,
                    AssetUpdate {
                        name: None,
                        category: Some(input.category),
                        location: Some(input.location),
                        purchase_date: Some(input.purchase_date),
                        warranty_end: Some(input.warranty_end),
                        frequency_days: Some(input.frequency_days),
                        assigned_user_id: Some(input.assigned_user_id),
                    },
                )
                .await?
        }
        None => state.asset_service.create(admin, input).await?,
    };

    println!("  asset {:<22} id={}", asset.name, asset.id);
    Ok(asset.id)
}
