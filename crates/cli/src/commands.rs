use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use agentmem_conflict::{ConflictResolver, ConflictResolverConfig};
use agentmem_engine::{ContextRequest, EngineOps, RecallOptions, RememberOptions, Tier, UnifiedEngine};
use agentmem_model::{ConflictMetadata, ConflictingData, MemoryType, Permissions};
use agentmem_optimizer::{Optimizer, OptimizerConfig};
use agentmem_sharing::{AlwaysSucceedsTransport, SharingConfig, SharingManager};
use agentmem_vector::InMemoryVectorStore;

use crate::{Commands, ConflictCommands, TierCommands};

pub async fn run(engine: &UnifiedEngine, tenant: &str, command: Commands) -> Result<()> {
    match command {
        Commands::Remember { content, agent, memory_type, importance } => {
            let options = RememberOptions {
                memory_type: memory_type.as_deref().map(parse_memory_type).transpose()?,
                importance,
                ..Default::default()
            };
            let id = engine.remember(&content, tenant, agent.as_deref(), options).await?;
            println!("{id}");
        }
        Commands::Recall { query, agent, limit, threshold, time_decay } => {
            let options = RecallOptions {
                memory_type: None,
                limit,
                threshold,
                include_context: false,
                time_decay,
            };
            let results = engine.recall(&query, tenant, agent.as_deref(), options).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Forget { query, agent, threshold } => {
            let deleted = engine.forget(&query, tenant, agent.as_deref(), threshold).await?;
            println!("deleted {deleted} memories");
        }
        Commands::Context { topic, agent, limit } => {
            let mut request = ContextRequest::new(tenant);
            request.topic = topic;
            request.agent_id = agent;
            request.limit = limit;
            let result = engine.context(request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Stats => {
            let health = engine.health_check().await?;
            let stats = engine.get_stats().await;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                "health": health,
                "engine_stats": stats,
            }))?);
        }
        Commands::Tier { command } => match command {
            TierCommands::Info => {
                let (tier, chain) = engine.get_tier_info().await;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "current_tier": tier.as_str(),
                        "fallback_chain": chain.iter().map(Tier::as_str).collect::<Vec<_>>(),
                    }))?
                );
            }
            TierCommands::Switch { tier } => {
                let tier = parse_tier(&tier)?;
                engine.switch_tier(tier).await;
                println!("switched to {}", tier.as_str());
            }
        },
        Commands::Optimize => {
            let optimizer = Optimizer::new(engine.storage(), Arc::new(InMemoryVectorStore::new()), OptimizerConfig::default());
            let stats = optimizer.optimize(tenant).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Share { memory_id, target, permission } => {
            let record = engine
                .storage()
                .retrieve(&memory_id)
                .await?
                .ok_or_else(|| anyhow!("no such memory: {memory_id}"))?;
            let mut permissions = Permissions::default();
            let grants = match permission.as_str() {
                "read" => &mut permissions.read,
                "write" => &mut permissions.write,
                "delete" => &mut permissions.delete,
                "share" => &mut permissions.share,
                other => return Err(anyhow!("unknown permission: {other}")),
            };
            grants.extend(target.iter().cloned());
            let sharing = SharingManager::new(SharingConfig::default(), Box::new(AlwaysSucceedsTransport));
            let shared = sharing.share(record, tenant, target, permissions).await;
            println!("{}", serde_json::to_string_pretty(&shared)?);
        }
        Commands::Conflict { command } => match command {
            ConflictCommands::List { input } => {
                let groups = load_conflict_groups(&input)?;
                let resolver = ConflictResolver::new(ConflictResolverConfig::default());
                let mut conflicts = Vec::new();
                for entries in groups {
                    if let Some(conflict) = resolver.detect(tenant, entries, ConflictMetadata::default()).await? {
                        conflicts.push(conflict);
                    }
                }
                println!("{}", serde_json::to_string_pretty(&conflicts)?);
            }
        },
    }
    Ok(())
}

fn load_conflict_groups(path: &Path) -> Result<Vec<Vec<ConflictingData>>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {} as conflict groups", path.display()))
}

fn parse_memory_type(raw: &str) -> Result<MemoryType> {
    match raw {
        "fact" => Ok(MemoryType::Fact),
        "preference" => Ok(MemoryType::Preference),
        "procedure" => Ok(MemoryType::Procedure),
        "task" => Ok(MemoryType::Task),
        "emotion" => Ok(MemoryType::Emotion),
        "personality" => Ok(MemoryType::Personality),
        "thread" => Ok(MemoryType::Thread),
        other => Err(anyhow!("unknown memory type: {other}")),
    }
}

fn parse_tier(raw: &str) -> Result<Tier> {
    match raw {
        "advanced" => Ok(Tier::Advanced),
        "smart" => Ok(Tier::Smart),
        "basic" => Ok(Tier::Basic),
        "mock" => Ok(Tier::Mock),
        other => Err(anyhow!("unknown tier: {other}")),
    }
}
