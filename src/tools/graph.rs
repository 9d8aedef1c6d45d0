//! Built-in graph tools over the Entity / RelationshipDetail model.
//!
//! Entities are connected through intermediate `RelationshipDetail` nodes:
//! `(:Entity)-[]->(:RelationshipDetail)-[]->(:Entity)`. One such hop is a
//! "tier". All caller values travel as query parameters; only validated
//! integer path lengths are rendered into query text.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::graph::Query;
use crate::tools::catalog::{ParamDef, ParamType, ToolCategory, ToolDescriptor, ToolRegistry};
use crate::tools::handler::{ToolArgs, ToolContext, ToolHandler};
use crate::types::{Error, Result};

pub const MAX_TIER: i64 = 10;
pub const MAX_LIMIT: i64 = 1000;
const DEFAULT_LIMIT: i64 = 250;

// =============================================================================
// Entity resolution
// =============================================================================

/// Identifiers for one entity, in lookup priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRef {
    pub id: Option<String>,
    pub ticker: Option<String>,
    pub short_name: Option<String>,
    pub legal_name: Option<String>,
}

impl EntityRef {
    /// Read `id{suffix}`, `ticker{suffix}`, ... from the arguments.
    pub fn from_args(args: &ToolArgs, suffix: &str) -> Result<Self> {
        let entity = Self {
            id: args.str_opt(&format!("id{}", suffix)),
            ticker: args.str_opt(&format!("ticker{}", suffix)),
            short_name: args.str_opt(&format!("short_name{}", suffix)),
            legal_name: args.str_opt(&format!("legal_name{}", suffix)),
        };
        if entity.is_empty() {
            let names: Vec<String> = ["id", "ticker", "short_name", "legal_name"]
                .iter()
                .map(|n| format!("{}{}", n, suffix))
                .collect();
            return Err(Error::ArgumentValidation {
                problems: vec![format!("one of {} must be provided", names.join(", "))],
                params: names,
            });
        }
        Ok(entity)
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.ticker.is_none() && self.short_name.is_none() && self.legal_name.is_none()
    }

    pub fn is_exact(&self) -> bool {
        self.id.is_some()
    }

    /// `MATCH` clause binding `var`; parameters are prefixed with `var`.
    pub fn match_clause(&self, var: &str, params: &mut Map<String, Value>) -> String {
        if let Some(id) = &self.id {
            let key = format!("{}_id", var);
            params.insert(key.clone(), Value::String(id.clone()));
            return format!("MATCH ({v}) WHERE {v}.id = ${k}", v = var, k = key);
        }
        if let Some(ticker) = &self.ticker {
            let key = format!("{}_ticker", var);
            params.insert(key.clone(), Value::String(ticker.clone()));
            return format!(
                "MATCH ({v}:Entity) WHERE toLower({v}.ticker) = toLower(${k})",
                v = var,
                k = key
            );
        }

        let mut conditions = Vec::new();
        for (field, value) in [("short_name", &self.short_name), ("legal_name", &self.legal_name)] {
            if let Some(value) = value {
                let key = format!("{}_{}", var, field);
                params.insert(key.clone(), Value::String(value.clone()));
                conditions.push(format!(
                    "(toLower({v}.short_name) CONTAINS toLower(${k}) OR toLower({v}.legal_name) CONTAINS toLower(${k}))",
                    v = var,
                    k = key
                ));
            }
        }
        format!("MATCH ({v}:Entity) WHERE {c}", v = var, c = conditions.join(" OR "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    fn parse(value: Option<String>, param: &str) -> Result<Option<Self>> {
        match value.as_deref() {
            None => Ok(None),
            Some("inbound") => Ok(Some(Direction::Inbound)),
            Some("outbound") => Ok(Some(Direction::Outbound)),
            Some(other) => Err(Error::invalid_argument(
                param,
                format!("direction must be inbound or outbound, got '{}'", other),
            )),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }

    /// Variable-length relationship pattern of up to `max_rels` hops.
    fn var_length(direction: Option<Self>, max_rels: i64) -> String {
        match direction {
            Some(Direction::Outbound) => format!("-[*1..{}]->", max_rels),
            Some(Direction::Inbound) => format!("<-[*1..{}]-", max_rels),
            None => format!("-[*1..{}]-", max_rels),
        }
    }
}

/// Fixed-length chain from `(start)` ending in `(n:Entity)` exactly `tier` tiers away.
fn tier_chain(direction: Direction, tier: i64) -> String {
    let (hop, last) = match direction {
        Direction::Inbound => (
            "<-[]-(:RelationshipDetail)<-[]-(:Entity)",
            "<-[]-(:RelationshipDetail)<-[]-(n:Entity)",
        ),
        Direction::Outbound => (
            "-[]->(:RelationshipDetail)-[]->(:Entity)",
            "-[]->(:RelationshipDetail)-[]->(n:Entity)",
        ),
    };
    let mut pattern = String::from("(start)");
    for i in 0..tier {
        pattern.push_str(if i == tier - 1 { last } else { hop });
    }
    pattern
}

const SIMPLE_PATH: &str = "ALL(n IN nodes(path) WHERE SINGLE(x IN nodes(path) WHERE x = n))";
const ALTERNATING: &str = "ALL(i IN range(0, size(nodes(path)) - 1) WHERE \
     (i % 2 = 0 AND 'Entity' IN labels(nodes(path)[i])) OR \
     (i % 2 = 1 AND 'RelationshipDetail' IN labels(nodes(path)[i])))";

fn bounded(args: &ToolArgs, name: &str, default: i64, min: i64, max: i64) -> Result<i64> {
    let value = args.i64_or(name, default);
    if value < min || value > max {
        return Err(Error::invalid_argument(
            name,
            format!("{} must be within {}..={}, got {}", name, min, max, value),
        ));
    }
    Ok(value)
}

fn column(row: &Map<String, Value>, name: &str) -> Value {
    row.get(name).cloned().unwrap_or(Value::Null)
}

// =============================================================================
// Handlers
// =============================================================================

struct FindEntity;

#[async_trait]
impl ToolHandler for FindEntity {
    async fn call(&self, ctx: &mut ToolContext<'_>, args: &ToolArgs) -> Result<Value> {
        let entity = EntityRef::from_args(args, "")?;
        let limit = bounded(args, "limit", DEFAULT_LIMIT, 1, MAX_LIMIT)?;

        let mut params = Map::new();
        let matched = entity.match_clause("n", &mut params);
        let text = if entity.is_exact() {
            format!("{}\nRETURN n AS node\nLIMIT 1", matched)
        } else {
            params.insert("limit".into(), json!(limit));
            format!("{}\nRETURN n AS node\nLIMIT $limit", matched)
        };

        let rows = ctx.query(&Query::new(text).params(params)).await?;
        let results: Vec<Value> = rows.rows().iter().map(|r| column(r, "node")).collect();
        Ok(json!({ "count": results.len(), "results": results }))
    }
}

struct FindTier {
    direction: Direction,
}

#[async_trait]
impl ToolHandler for FindTier {
    async fn call(&self, ctx: &mut ToolContext<'_>, args: &ToolArgs) -> Result<Value> {
        let entity = EntityRef::from_args(args, "")?;
        let tier = bounded(args, "tier", 1, 1, MAX_TIER)?;
        let limit = bounded(args, "limit", DEFAULT_LIMIT, 1, MAX_LIMIT)?;

        let mut params = Map::new();
        let matched = entity.match_clause("start", &mut params);
        params.insert("limit".into(), json!(limit));
        let text = format!(
            "{matched}\n\
             WITH DISTINCT start\n\
             MATCH path = {chain}\n\
             WHERE {SIMPLE_PATH}\n\
             WITH n, min(length(path) / 2) AS tier\n\
             RETURN n AS node, tier\n\
             LIMIT $limit",
            chain = tier_chain(self.direction, tier),
        );

        let rows = ctx.query(&Query::new(text).params(params)).await?;
        let results: Vec<Value> = rows
            .rows()
            .iter()
            .map(|r| json!({ "node": column(r, "node"), "tier": column(r, "tier") }))
            .collect();
        Ok(json!({
            "count": results.len(),
            "direction": self.direction.as_str(),
            "tier": tier,
            "results": results,
        }))
    }
}

struct FindRelatedEntities;

#[async_trait]
impl ToolHandler for FindRelatedEntities {
    async fn call(&self, ctx: &mut ToolContext<'_>, args: &ToolArgs) -> Result<Value> {
        let entity = EntityRef::from_args(args, "")?;
        let min_tier = bounded(args, "min_tier", 1, 0, MAX_TIER)?;
        let max_tier = bounded(args, "max_tier", 1, 1, MAX_TIER)?;
        if max_tier < min_tier {
            return Err(Error::invalid_argument(
                "max_tier",
                format!("max_tier ({}) must be >= min_tier ({})", max_tier, min_tier),
            ));
        }
        let direction = Direction::parse(args.str_opt("direction"), "direction")?;
        let limit = bounded(args, "limit", DEFAULT_LIMIT, 1, MAX_LIMIT)?;

        let mut params = Map::new();
        let matched = entity.match_clause("start", &mut params);
        params.insert("min_tier".into(), json!(min_tier));
        params.insert("max_tier".into(), json!(max_tier));
        params.insert("limit".into(), json!(limit));
        let text = format!(
            "{matched}\n\
             WITH DISTINCT start\n\
             MATCH path = (start){rels}(e:Entity)\n\
             WHERE {SIMPLE_PATH} AND {ALTERNATING}\n\
             WITH e, size([n IN nodes(path) WHERE 'Entity' IN labels(n)]) - 1 AS tier\n\
             WHERE tier >= $min_tier AND tier <= $max_tier\n\
             RETURN DISTINCT e AS entity, tier\n\
             ORDER BY tier\n\
             LIMIT $limit",
            rels = Direction::var_length(direction, 2 * max_tier),
        );

        let rows = ctx.query(&Query::new(text).params(params)).await?;
        let results: Vec<Value> = rows
            .rows()
            .iter()
            .map(|r| {
                let mut entity = match column(r, "entity") {
                    Value::Object(map) => map,
                    other => {
                        let mut map = Map::new();
                        map.insert("entity".into(), other);
                        map
                    }
                };
                entity.insert("tier".into(), column(r, "tier"));
                Value::Object(entity)
            })
            .collect();
        Ok(json!({
            "count": results.len(),
            "min_tier": min_tier,
            "max_tier": max_tier,
            "direction": direction.map(Direction::as_str),
            "results": results,
        }))
    }
}

/// Shared prelude for two-entity queries: binds `e1` and `e2`.
fn pair_prelude(args: &ToolArgs, params: &mut Map<String, Value>) -> Result<String> {
    let first = EntityRef::from_args(args, "1")?;
    let second = EntityRef::from_args(args, "2")?;
    Ok(format!(
        "{}\nWITH DISTINCT e1\n{}\nWITH DISTINCT e1, e2",
        first.match_clause("e1", params),
        second.match_clause("e2", params),
    ))
}

struct FindRelationshipDetails;

#[async_trait]
impl ToolHandler for FindRelationshipDetails {
    async fn call(&self, ctx: &mut ToolContext<'_>, args: &ToolArgs) -> Result<Value> {
        let limit = bounded(args, "limit", DEFAULT_LIMIT, 1, MAX_LIMIT)?;
        let mut params = Map::new();
        let prelude = pair_prelude(args, &mut params)?;
        params.insert("limit".into(), json!(limit));

        let text = format!(
            "{prelude}\n\
             OPTIONAL MATCH (e1)-[]->(rd_out:RelationshipDetail)-[]->(e2)\n\
             OPTIONAL MATCH (e1)<-[]-(rd_in:RelationshipDetail)<-[]-(e2)\n\
             WITH e1, e2,\n\
               collect(DISTINCT {{rd: rd_out, dir: e1.short_name + ' -> ' + e2.short_name}}) AS outbound_rels,\n\
               collect(DISTINCT {{rd: rd_in, dir: e2.short_name + ' -> ' + e1.short_name}}) AS inbound_rels\n\
             UNWIND (outbound_rels + inbound_rels) AS rel\n\
             WITH rel WHERE rel.rd IS NOT NULL\n\
             WITH rel.rd AS rd, rel.dir AS dir\n\
             RETURN rd.id AS id, rd.description AS description, rd.relationship_type AS relationship_type,\n\
               rd.source_url AS source_url, rd.created_at AS created_at, dir AS relationship_direction\n\
             ORDER BY rd.created_at DESC\n\
             LIMIT $limit"
        );

        let rows = ctx.query(&Query::new(text).params(params)).await?;
        let results: Vec<Value> = rows.into_rows().into_iter().map(Value::Object).collect();
        Ok(json!({ "count": results.len(), "results": results }))
    }
}

struct HasDirectedPath;

#[async_trait]
impl ToolHandler for HasDirectedPath {
    async fn call(&self, ctx: &mut ToolContext<'_>, args: &ToolArgs) -> Result<Value> {
        let direction = Direction::parse(args.str_opt("direction"), "direction")?
            .unwrap_or(Direction::Outbound);
        let max_tier = bounded(args, "max_tier", MAX_TIER, 1, MAX_TIER)?;
        let mut params = Map::new();
        let prelude = pair_prelude(args, &mut params)?;

        let text = format!(
            "{prelude}\n\
             MATCH path = (e1){rels}(e2)\n\
             WHERE {ALTERNATING}\n\
             RETURN count(path) > 0 AS has_path",
            rels = Direction::var_length(Some(direction), 2 * max_tier),
        );

        let rows = ctx.query(&Query::new(text).params(params)).await?;
        let has_path = rows
            .first()
            .and_then(|r| r.get("has_path"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(json!({
            "has_path": has_path,
            "direction": direction.as_str(),
            "max_tier": max_tier,
        }))
    }
}

/// All single-direction alternating paths between two entities.
///
/// Paths are reported in flow order: for `inbound` the backend walks from the
/// first entity against the arrows, so each path is reversed before returning.
struct FindDirectedPaths {
    with_details: bool,
}

impl FindDirectedPaths {
    fn projection(&self, direction: Direction) -> String {
        if !self.with_details {
            return "RETURN [n IN nodes(path) WHERE 'Entity' IN labels(n)] AS path".to_string();
        }
        let (near, far) = match direction {
            Direction::Outbound => ("from", "to"),
            Direction::Inbound => ("to", "from"),
        };
        format!(
            "WITH nodes(path) AS ns\n\
             RETURN [i IN range(0, size(ns) - 3, 2) | {{\n\
               {near}: ns[i],\n\
               relationship_detail: {{id: ns[i + 1].id, description: ns[i + 1].description, \
             relationship_type: ns[i + 1].relationship_type, source_url: ns[i + 1].source_url, \
             created_at: ns[i + 1].created_at}},\n\
               {far}: ns[i + 2]\n\
             }}] AS path"
        )
    }
}

#[async_trait]
impl ToolHandler for FindDirectedPaths {
    async fn call(&self, ctx: &mut ToolContext<'_>, args: &ToolArgs) -> Result<Value> {
        let direction = Direction::parse(args.str_opt("direction"), "direction")?
            .unwrap_or(Direction::Outbound);
        let max_tier = bounded(args, "max_tier", MAX_TIER, 1, MAX_TIER)?;
        let limit = bounded(args, "limit", DEFAULT_LIMIT, 1, MAX_LIMIT)?;
        let mut params = Map::new();
        let prelude = pair_prelude(args, &mut params)?;
        params.insert("limit".into(), json!(limit));

        let text = format!(
            "{prelude}\n\
             MATCH path = (e1){rels}(e2)\n\
             WHERE {ALTERNATING}\n\
             {projection}\n\
             LIMIT $limit",
            rels = Direction::var_length(Some(direction), 2 * max_tier),
            projection = self.projection(direction),
        );

        let rows = ctx.query(&Query::new(text).params(params)).await?;
        let paths: Vec<Value> = rows
            .rows()
            .iter()
            .map(|r| match column(r, "path") {
                Value::Array(mut steps) => {
                    if direction == Direction::Inbound {
                        steps.reverse();
                    }
                    Value::Array(steps)
                }
                other => other,
            })
            .collect();
        Ok(json!({
            "count": paths.len(),
            "direction": direction.as_str(),
            "tier": max_tier,
            "paths": paths,
        }))
    }
}

struct FindShortestPath;

#[async_trait]
impl ToolHandler for FindShortestPath {
    async fn call(&self, ctx: &mut ToolContext<'_>, args: &ToolArgs) -> Result<Value> {
        let from = args.str_required("from")?;
        let to = args.str_required("to")?;
        if from == to {
            return Err(Error::invalid_argument("to", "from and to must name different entities"));
        }
        let max_tier = bounded(args, "max_tier", MAX_TIER, 1, MAX_TIER)?;

        let text = format!(
            "MATCH (e1 {{id: $from}}), (e2 {{id: $to}})\n\
             MATCH path = shortestPath((e1)-[*1..{rels}]-(e2))\n\
             WHERE {ALTERNATING}\n\
             RETURN [n IN nodes(path) WHERE 'Entity' IN labels(n)] AS path\n\
             LIMIT 1",
            rels = 2 * max_tier,
        );
        let query = Query::new(text).param("from", from).param("to", to);

        let rows = ctx.query(&query).await?;
        let path = rows
            .first()
            .and_then(|r| r.get("path"))
            .and_then(Value::as_array)
            .cloned();
        Ok(match path {
            Some(entities) => json!({
                "found": true,
                "tiers": entities.len().saturating_sub(1),
                "path": entities,
            }),
            None => json!({ "found": false, "tiers": Value::Null, "path": [] }),
        })
    }
}

// =============================================================================
// Registration
// =============================================================================

fn entity_params(suffix: &str, which: &str) -> Vec<ParamDef> {
    vec![
        ParamDef::optional(
            format!("id{}", suffix),
            ParamType::String,
            format!("Exact node id of the {} entity (highest priority)", which),
        ),
        ParamDef::optional(
            format!("ticker{}", suffix),
            ParamType::String,
            format!("Ticker of the {} entity, case-insensitive", which),
        ),
        ParamDef::optional(
            format!("short_name{}", suffix),
            ParamType::String,
            format!("Partial short name of the {} entity", which),
        ),
        ParamDef::optional(
            format!("legal_name{}", suffix),
            ParamType::String,
            format!("Partial legal name of the {} entity", which),
        ),
    ]
}

fn limit_param() -> ParamDef {
    ParamDef::optional(
        "limit",
        ParamType::BoundedInt { min: 1, max: MAX_LIMIT },
        "Maximum number of results",
    )
    .with_default(DEFAULT_LIMIT)
}

fn direction_type() -> ParamType {
    ParamType::Enum(vec!["inbound".to_string(), "outbound".to_string()])
}

/// Register every built-in graph tool.
pub fn register_builtin_tools(registry: &mut ToolRegistry) -> Result<()> {
    registry.register(
        ToolDescriptor::new(
            "find_entity",
            "Find entities by id, ticker, or partial short/legal name",
            ToolCategory::Analysis,
            Arc::new(FindEntity),
        )
        .params(entity_params("", "target"))
        .param(limit_param()),
    )?;

    for (name, direction, description) in [
        (
            "find_inbound_tier",
            Direction::Inbound,
            "Entities exactly N tiers upstream of an entity",
        ),
        (
            "find_outbound_tier",
            Direction::Outbound,
            "Entities exactly N tiers downstream of an entity",
        ),
    ] {
        registry.register(
            ToolDescriptor::new(name, description, ToolCategory::Analysis, Arc::new(FindTier { direction }))
                .params(entity_params("", "starting"))
                .param(
                    ParamDef::optional("tier", ParamType::BoundedInt { min: 1, max: MAX_TIER }, "Tier distance")
                        .with_default(1),
                )
                .param(limit_param()),
        )?;
    }

    registry.register(
        ToolDescriptor::new(
            "find_related_entities",
            "Entities connected to an entity within a tier range",
            ToolCategory::Analysis,
            Arc::new(FindRelatedEntities),
        )
        .params(entity_params("", "starting"))
        .param(
            ParamDef::optional("min_tier", ParamType::BoundedInt { min: 0, max: MAX_TIER }, "Minimum tier")
                .with_default(1),
        )
        .param(
            ParamDef::optional("max_tier", ParamType::BoundedInt { min: 1, max: MAX_TIER }, "Maximum tier")
                .with_default(1),
        )
        .param(ParamDef::optional(
            "direction",
            direction_type(),
            "inbound or outbound; both when omitted",
        ))
        .param(limit_param()),
    )?;

    registry.register(
        ToolDescriptor::new(
            "find_relationship_details",
            "Relationship details between two entities in both directions, newest first",
            ToolCategory::Analysis,
            Arc::new(FindRelationshipDetails),
        )
        .params(entity_params("1", "first"))
        .params(entity_params("2", "second"))
        .param(limit_param()),
    )?;

    registry.register(
        ToolDescriptor::new(
            "has_directed_path",
            "Whether a single-direction path connects two entities",
            ToolCategory::Detection,
            Arc::new(HasDirectedPath),
        )
        .params(entity_params("1", "first"))
        .params(entity_params("2", "second"))
        .param(
            ParamDef::optional("direction", direction_type(), "Direction relative to the first entity")
                .with_default("outbound"),
        )
        .param(
            ParamDef::optional("max_tier", ParamType::BoundedInt { min: 1, max: MAX_TIER }, "Maximum tiers")
                .with_default(MAX_TIER),
        ),
    )?;

    for (name, with_details, description) in [
        (
            "find_directed_paths",
            false,
            "All single-direction paths between two entities, as entity lists",
        ),
        (
            "find_directed_paths_with_relationship_details",
            true,
            "All single-direction paths between two entities, as from/relationship_detail/to segments",
        ),
    ] {
        registry.register(
            ToolDescriptor::new(
                name,
                description,
                ToolCategory::Analysis,
                Arc::new(FindDirectedPaths { with_details }),
            )
            .params(entity_params("1", "first"))
            .params(entity_params("2", "second"))
            .param(
                ParamDef::optional("direction", direction_type(), "Direction relative to the first entity")
                    .with_default("outbound"),
            )
            .param(
                ParamDef::optional("max_tier", ParamType::BoundedInt { min: 1, max: MAX_TIER }, "Maximum tiers per path")
                    .with_default(MAX_TIER),
            )
            .param(limit_param()),
        )?;
    }

    registry.register(
        ToolDescriptor::new(
            "find_shortest_path",
            "Shortest entity path between two entity ids",
            ToolCategory::Computation,
            Arc::new(FindShortestPath),
        )
        .param(ParamDef::required("from", ParamType::String, "Start entity id"))
        .param(ParamDef::required("to", ParamType::String, "End entity id"))
        .param(
            ParamDef::optional("max_tier", ParamType::BoundedInt { min: 1, max: MAX_TIER }, "Maximum tiers")
                .with_default(MAX_TIER),
        ),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::testing::{row, StubBackend};
    use crate::graph::{QueryExecutor, SessionPool};
    use crate::tools::Dispatcher;
    use crate::types::{ErrorKind, ExecutorConfig, PoolConfig, ToolCallRequest};
    use pretty_assertions::assert_eq;

    fn args(value: Value) -> ToolArgs {
        ToolArgs::new(value.as_object().cloned().unwrap())
    }

    async fn dispatcher(backend: &StubBackend) -> Dispatcher {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry).unwrap();
        let pool = SessionPool::connect(backend.shared(), PoolConfig::default()).await.unwrap();
        Dispatcher::new(Arc::new(registry), pool, QueryExecutor::new(ExecutorConfig::default()))
    }

    async fn call(d: &Dispatcher, tool: &str, a: Value) -> crate::types::ToolCallResult {
        d.dispatch(ToolCallRequest::new("c1", tool, a.as_object().cloned().unwrap()))
            .await
    }

    #[test]
    fn builtin_tools_register_cleanly() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry).unwrap();
        let names: Vec<String> = registry.metadata().into_iter().map(|m| m.name).collect();
        assert_eq!(
            names,
            vec![
                "find_directed_paths",
                "find_directed_paths_with_relationship_details",
                "find_entity",
                "find_inbound_tier",
                "find_outbound_tier",
                "find_related_entities",
                "find_relationship_details",
                "find_shortest_path",
                "has_directed_path",
            ]
        );
        assert_eq!(
            registry.lookup("has_directed_path").unwrap().category,
            ToolCategory::Detection
        );
    }

    #[test]
    fn entity_priority_prefers_id_then_ticker() {
        let entity = EntityRef {
            id: Some("42".into()),
            ticker: Some("OKLO".into()),
            ..EntityRef::default()
        };
        let mut params = Map::new();
        let clause = entity.match_clause("n", &mut params);
        assert_eq!(clause, "MATCH (n) WHERE n.id = $n_id");
        assert_eq!(params.len(), 1);

        let entity = EntityRef {
            ticker: Some("OKLO".into()),
            short_name: Some("Oklo".into()),
            ..EntityRef::default()
        };
        let mut params = Map::new();
        let clause = entity.match_clause("e1", &mut params);
        assert!(clause.contains("toLower(e1.ticker) = toLower($e1_ticker)"));
        assert_eq!(params["e1_ticker"], "OKLO");
    }

    #[test]
    fn names_are_or_combined() {
        let entity = EntityRef {
            short_name: Some("Oklo".into()),
            legal_name: Some("Oklo Inc".into()),
            ..EntityRef::default()
        };
        let mut params = Map::new();
        let clause = entity.match_clause("start", &mut params);
        assert!(clause.contains("$start_short_name"));
        assert!(clause.contains(") OR ("));
        assert_eq!(params["start_legal_name"], "Oklo Inc");
    }

    #[test]
    fn blank_identifiers_are_missing() {
        let err = EntityRef::from_args(&args(json!({"id": "  ", "ticker": ""})), "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentValidationError);
        let err = EntityRef::from_args(&args(json!({})), "2").unwrap_err();
        assert!(err.message().contains("id2, ticker2, short_name2, legal_name2"));
    }

    #[test]
    fn tier_chain_length() {
        let chain = tier_chain(Direction::Inbound, 2);
        assert_eq!(
            chain,
            "(start)<-[]-(:RelationshipDetail)<-[]-(:Entity)<-[]-(:RelationshipDetail)<-[]-(n:Entity)"
        );
        assert_eq!(
            tier_chain(Direction::Outbound, 1),
            "(start)-[]->(:RelationshipDetail)-[]->(n:Entity)"
        );
    }

    #[tokio::test]
    async fn find_entity_by_id_uses_limit_one() {
        let backend = StubBackend::new();
        backend.push(Ok(vec![row(&[("node", json!({"id": "42", "ticker": "OKLO"}))])]));
        let d = dispatcher(&backend).await;

        let result = call(&d, "find_entity", json!({"id": "42"})).await;
        assert!(result.success);
        assert_eq!(
            result.result.unwrap(),
            json!({"count": 1, "results": [{"id": "42", "ticker": "OKLO"}]})
        );
        let query = backend.last_query().unwrap();
        assert!(query.text.ends_with("LIMIT 1"));
        assert_eq!(query.params["n_id"], "42");
        assert!(!query.params.contains_key("limit"));
    }

    #[tokio::test]
    async fn find_entity_by_name_passes_limit_as_param() {
        let backend = StubBackend::new();
        let d = dispatcher(&backend).await;

        let result = call(&d, "find_entity", json!({"short_name": " oklo ", "limit": 5})).await;
        assert!(result.success);
        let query = backend.last_query().unwrap();
        assert_eq!(query.params["n_short_name"], "oklo");
        assert_eq!(query.params["limit"], 5);
        assert!(!query.text.contains("oklo"));
    }

    #[tokio::test]
    async fn find_entity_without_identifier_fails_before_query() {
        let backend = StubBackend::new();
        let d = dispatcher(&backend).await;

        let result = call(&d, "find_entity", json!({})).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ToolExecutionError));
        let details = result.error.unwrap().details.unwrap();
        assert_eq!(details["original_kind"], "ARGUMENT_VALIDATION_ERROR");
        assert_eq!(
            details["params"],
            json!(["id", "ticker", "short_name", "legal_name"])
        );
        assert!(backend.last_query().is_none());
    }

    #[tokio::test]
    async fn outbound_tier_shapes_rows() {
        let backend = StubBackend::new();
        backend.push(Ok(vec![row(&[("node", json!({"id": "b"})), ("tier", json!(2))])]));
        let d = dispatcher(&backend).await;

        let result = call(&d, "find_outbound_tier", json!({"ticker": "OKLO", "tier": 2})).await;
        let body = result.result.unwrap();
        assert_eq!(body["tier"], 2);
        assert_eq!(body["direction"], "outbound");
        assert_eq!(body["results"][0]["node"]["id"], "b");
        let query = backend.last_query().unwrap();
        assert_eq!(query.text.matches("(:RelationshipDetail)").count(), 2);
    }

    #[tokio::test]
    async fn tier_out_of_range_rejected_by_schema() {
        let backend = StubBackend::new();
        let d = dispatcher(&backend).await;

        let result = call(&d, "find_inbound_tier", json!({"id": "a", "tier": 11})).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ArgumentValidationError));
        assert_eq!(d.pool().stats().total_leases, 0);
    }

    #[tokio::test]
    async fn related_entities_flatten_tier_into_entity() {
        let backend = StubBackend::new();
        backend.push(Ok(vec![row(&[("entity", json!({"id": "b", "short_name": "B"})), ("tier", json!(1))])]));
        let d = dispatcher(&backend).await;

        let result = call(
            &d,
            "find_related_entities",
            json!({"id": "a", "max_tier": 2, "direction": "inbound"}),
        )
        .await;
        let body = result.result.unwrap();
        assert_eq!(body["results"][0], json!({"id": "b", "short_name": "B", "tier": 1}));
        assert_eq!(body["direction"], "inbound");
        let query = backend.last_query().unwrap();
        assert!(query.text.contains("(start)<-[*1..4]-(e:Entity)"));
        assert_eq!(query.params["max_tier"], 2);
    }

    #[tokio::test]
    async fn related_entities_rejects_inverted_range() {
        let backend = StubBackend::new();
        let d = dispatcher(&backend).await;

        let result = call(&d, "find_related_entities", json!({"id": "a", "min_tier": 3, "max_tier": 2})).await;
        let error = result.error.unwrap();
        assert!(error.message.contains("max_tier"));
    }

    #[tokio::test]
    async fn relationship_details_prefix_both_entities() {
        let backend = StubBackend::new();
        backend.push(Ok(vec![row(&[
            ("id", json!("rd1")),
            ("relationship_type", json!("supplier")),
            ("relationship_direction", json!("A -> B")),
        ])]));
        let d = dispatcher(&backend).await;

        let result = call(
            &d,
            "find_relationship_details",
            json!({"ticker1": "AAA", "id2": "b"}),
        )
        .await;
        let body = result.result.unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["results"][0]["relationship_type"], "supplier");
        let query = backend.last_query().unwrap();
        assert_eq!(query.params["e1_ticker"], "AAA");
        assert_eq!(query.params["e2_id"], "b");
        assert!(query.text.contains("ORDER BY rd.created_at DESC"));
    }

    #[tokio::test]
    async fn has_directed_path_reads_boolean() {
        let backend = StubBackend::new();
        backend.push(Ok(vec![row(&[("has_path", json!(true))])]));
        let d = dispatcher(&backend).await;

        let result = call(
            &d,
            "has_directed_path",
            json!({"id1": "a", "id2": "b", "direction": "inbound", "max_tier": 3}),
        )
        .await;
        assert_eq!(result.result.unwrap()["has_path"], true);
        let query = backend.last_query().unwrap();
        assert!(query.text.contains("(e1)<-[*1..6]-(e2)"));
    }

    #[tokio::test]
    async fn directed_paths_list_entities_in_flow_order() {
        let backend = StubBackend::new();
        backend.push(Ok(vec![row(&[("path", json!([{"id": "a"}, {"id": "x"}, {"id": "b"}]))])]));
        let d = dispatcher(&backend).await;

        let result = call(
            &d,
            "find_directed_paths",
            json!({"id1": "a", "ticker2": "MSFT", "direction": "inbound", "max_tier": 2}),
        )
        .await;
        let body = result.result.unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["direction"], "inbound");
        assert_eq!(body["tier"], 2);
        assert_eq!(body["paths"][0], json!([{"id": "b"}, {"id": "x"}, {"id": "a"}]));
        let query = backend.last_query().unwrap();
        assert!(query.text.contains("(e1)<-[*1..4]-(e2)"));
        assert!(query.text.contains("'RelationshipDetail' IN labels"));
        assert_eq!(query.params["e2_ticker"], "MSFT");
        assert_eq!(query.params["limit"], 250);
    }

    #[tokio::test]
    async fn directed_paths_with_details_return_segments() {
        let backend = StubBackend::new();
        let segment = json!({
            "from": {"id": "a"},
            "relationship_detail": {"id": "rd1", "relationship_type": "ownership"},
            "to": {"id": "b"},
        });
        backend.push(Ok(vec![row(&[("path", json!([segment.clone()]))])]));
        let d = dispatcher(&backend).await;

        let result = call(
            &d,
            "find_directed_paths_with_relationship_details",
            json!({"id1": "a", "id2": "b"}),
        )
        .await;
        let body = result.result.unwrap();
        assert_eq!(body["direction"], "outbound");
        assert_eq!(body["tier"], MAX_TIER);
        assert_eq!(body["paths"], json!([[segment]]));
        let query = backend.last_query().unwrap();
        assert!(query.text.contains("(e1)-[*1..20]->(e2)"));
        assert!(query.text.contains("from: ns[i]"));
        assert!(query.text.contains("relationship_detail: {id: ns[i + 1].id"));
    }

    #[tokio::test]
    async fn shortest_path_found_and_missing() {
        let backend = StubBackend::new();
        backend.push(Ok(vec![row(&[("path", json!([{"id": "A"}, {"id": "X"}, {"id": "B"}]))])]));
        backend.push(Ok(Vec::new()));
        let d = dispatcher(&backend).await;

        let found = call(&d, "find_shortest_path", json!({"from": "A", "to": "B"})).await;
        let body = found.result.unwrap();
        assert_eq!(body["found"], true);
        assert_eq!(body["tiers"], 2);
        let query = backend.last_query().unwrap();
        assert!(query.text.contains("shortestPath((e1)-[*1..20]-(e2))"));
        assert_eq!(query.params["from"], "A");

        let missing = call(&d, "find_shortest_path", json!({"from": "A", "to": "C"})).await;
        assert_eq!(missing.result.unwrap()["found"], false);
    }

    #[tokio::test]
    async fn shortest_path_requires_distinct_endpoints() {
        let backend = StubBackend::new();
        let d = dispatcher(&backend).await;
        let result = call(&d, "find_shortest_path", json!({"from": "A", "to": "A"})).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ToolExecutionError));
        assert!(backend.last_query().is_none());
    }
}
