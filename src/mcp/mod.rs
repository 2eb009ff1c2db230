//! MCP stdio adapter over the Query Surface (§6 `mcp`): `list_repos, search,
//! cypher, overview, explore, impact`, thin `#[tool]` wrappers returning JSON
//! text content with a short next-step hint appended, matching the shape of
//! the teacher's `CodeIntelligenceServer`.

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, ErrorData as McpError, Implementation, ProtocolVersion, ServerCapabilities,
    ServerInfo,
};
use rmcp::transport::stdio;
use rmcp::{tool, tool_handler, tool_router, ServerHandler, ServiceExt};
use serde::{Deserialize, Serialize};

use crate::query::{ExploreKind, ImpactDirection, QuerySurface, SearchDepth};
use crate::Settings;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    /// Search query text.
    pub query: String,
    /// Maximum number of results (default 10).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CypherRequest {
    /// A query in the supported Cypher subset.
    pub query: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExploreRequest {
    /// Name of the symbol, cluster, or process to explore.
    pub name: String,
    /// One of `symbol`, `cluster`, `process` (default `symbol`).
    #[serde(default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "symbol".to_string()
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImpactRequest {
    /// Name of the symbol whose blast radius to compute.
    pub target: String,
    /// `upstream` or `downstream` (default `downstream`).
    #[serde(default = "default_direction")]
    pub direction: String,
    /// Maximum BFS depth (default 3).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Minimum relation confidence to traverse (default 0.0).
    #[serde(default)]
    pub min_confidence: f64,
}

fn default_direction() -> String {
    "downstream".to_string()
}

fn default_max_depth() -> usize {
    3
}

/// Wraps a JSON payload with a short, task-oriented next-step hint (§6).
#[derive(Serialize)]
struct WithHint<T: Serialize> {
    #[serde(flatten)]
    data: T,
    hint: &'static str,
}

fn json_result<T: Serialize>(data: T, hint: &'static str) -> CallToolResult {
    let payload = WithHint { data, hint };
    match serde_json::to_string_pretty(&payload) {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => CallToolResult::error(vec![Content::text(format!("failed to serialize result: {e}"))]),
    }
}

#[derive(Clone)]
pub struct GitNexusMcpServer {
    surface: std::sync::Arc<QuerySurface>,
    repo_path: String,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GitNexusMcpServer {
    pub fn new(surface: QuerySurface, settings: &Settings) -> Self {
        Self {
            surface: std::sync::Arc::new(surface),
            repo_path: settings.repo_path.display().to_string(),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List the repository this server is serving")]
    pub async fn list_repos(&self) -> std::result::Result<CallToolResult, McpError> {
        Ok(json_result(
            serde_json::json!({ "repos": [{ "path": self.repo_path }] }),
            "use `search` or `overview` to start exploring this repository",
        ))
    }

    #[tool(description = "Hybrid BM25 + semantic search over the repository, fused with RRF")]
    pub async fn search(
        &self,
        Parameters(SearchRequest { query, limit }): Parameters<SearchRequest>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let hits = self.surface.search(&query, limit, SearchDepth::Full);
        Ok(json_result(
            serde_json::json!({ "hits": hits }),
            "use `explore` on a hit's symbols for a detailed report, or `impact` before changing one",
        ))
    }

    #[tool(description = "Run a query in the supported Cypher subset")]
    pub async fn cypher(
        &self,
        Parameters(CypherRequest { query }): Parameters<CypherRequest>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self.surface.cypher(&query) {
            Ok(rows) => Ok(json_result(
                serde_json::json!({ "rows": rows }),
                "rows are in RETURN-clause order; `explore` a returned id for more detail",
            )),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }

    #[tool(description = "Repository-wide summary of clusters and processes")]
    pub async fn overview(&self) -> std::result::Result<CallToolResult, McpError> {
        let report = self.surface.overview();
        Ok(json_result(
            serde_json::json!(report),
            "use `explore` with kind=cluster or kind=process on any id above",
        ))
    }

    #[tool(description = "Canonical report for a symbol, cluster, or process")]
    pub async fn explore(
        &self,
        Parameters(ExploreRequest { name, kind }): Parameters<ExploreRequest>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let kind = match kind.as_str() {
            "cluster" => ExploreKind::Cluster,
            "process" => ExploreKind::Process,
            _ => ExploreKind::Symbol,
        };
        match self.surface.explore(&name, kind) {
            Ok(report) => Ok(json_result(
                serde_json::json!(report),
                "use `impact` before changing a symbol reported here",
            )),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }

    #[tool(description = "Blast-radius analysis: what breaks if this symbol changes")]
    pub async fn impact(
        &self,
        Parameters(ImpactRequest { target, direction, max_depth, min_confidence }): Parameters<ImpactRequest>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let direction = match direction.as_str() {
            "upstream" => ImpactDirection::Upstream,
            _ => ImpactDirection::Downstream,
        };
        match self.surface.impact(&target, direction, max_depth, &[], min_confidence) {
            Ok(report) => Ok(json_result(
                serde_json::json!(report),
                "depth-1 nodes will break; review depth-2 callers before merging",
            )),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }
}

#[tool_handler]
impl ServerHandler for GitNexusMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "gitnexus".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("GitNexus Code Knowledge Graph".to_string()),
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "This server exposes a read-only code knowledge graph for this repository. \
                Start with `overview` or `search` to orient, then `explore` a specific symbol, \
                cluster, or process, and check `impact` before recommending a change. `cypher` is \
                available for ad-hoc graph queries in a small MATCH/RETURN subset."
                    .to_string(),
            ),
        }
    }
}

/// Runs the MCP server over stdio until the client disconnects (§6 `mcp`).
pub async fn serve_stdio(surface: QuerySurface, settings: &Settings) -> crate::Result<()> {
    let server = GitNexusMcpServer::new(surface, settings);
    let service = server
        .serve(stdio())
        .await
        .map_err(|e| crate::error::GitNexusError::General(format!("failed to start MCP server: {e}")))?;
    service
        .waiting()
        .await
        .map_err(|e| crate::error::GitNexusError::General(format!("MCP server error: {e}")))?;
    Ok(())
}
