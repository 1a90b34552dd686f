//! LLM advisor: asks for a candidate plan and decodes the answer
//!
//! Every failure on this path (rendering, transport, provider errors, missing
//! or malformed JSON) is logged and turns into "no candidate".

use std::sync::Arc;

use eyre::Result;
use tracing::{debug, info, warn};

use super::candidate::CandidatePlan;
use super::ddl::TableIdentifier;
use super::mapping::TargetSchema;
use crate::domain::WorkloadQuery;
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::prompts::{AdvisorPromptContext, PromptLoader};
use crate::warehouse::TableStats;

pub const SYSTEM_PROMPT: &str = "You are a SQL & Iceberg performance expert.";

const TABLE_SUMMARY_CHARS: usize = 280;
const QUERY_SUMMARY_CHARS: usize = 320;

const NO_TABLES_LINE: &str = "- (no existing tables parsed; design a star-schema around events and dimensions)";
const NO_QUERIES_LINE: &str = "- (no queries provided)";

/// Everything the advisor prompt describes
pub struct AdvisorInput<'a> {
    pub target: &'a TargetSchema,
    pub tables: &'a [TableIdentifier],
    pub stats: &'a [TableStats],
    pub queries: &'a [WorkloadQuery],
}

pub struct Advisor {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
}

impl Advisor {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, max_tokens: u32) -> Self {
        Self {
            llm,
            prompts,
            max_tokens,
        }
    }

    pub fn build_prompt(&self, input: &AdvisorInput<'_>) -> Result<String> {
        let context = AdvisorPromptContext {
            catalog: input.target.catalog.clone(),
            schema: input.target.schema.clone(),
            tables: table_lines(input.tables, input.stats),
            queries: query_lines(input.queries),
        };
        self.prompts.render_advisor(&context)
    }

    /// Ask the LLM for a candidate plan
    pub async fn suggest(&self, input: &AdvisorInput<'_>) -> Option<CandidatePlan> {
        debug!(provider = %self.llm.provider(), schema = %input.target.schema, "Advisor::suggest: called");
        let prompt = match self.build_prompt(input) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Advisor::suggest: failed to render prompt");
                return None;
            }
        };

        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            messages: vec![Message::user(prompt)],
            max_tokens: self.max_tokens,
        };
        let response = match self.llm.complete(request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = %self.llm.provider(), error = %e, "Advisor::suggest: completion failed");
                return None;
            }
        };
        info!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Advisor::suggest: completion received"
        );

        let Some(content) = response.content else {
            warn!("Advisor::suggest: empty completion");
            return None;
        };
        let candidate = CandidatePlan::from_text(&content);
        if candidate.is_none() {
            warn!("Advisor::suggest: no JSON object in completion");
        }
        candidate
    }
}

fn table_lines(tables: &[TableIdentifier], stats: &[TableStats]) -> String {
    if tables.is_empty() {
        return NO_TABLES_LINE.to_string();
    }
    tables
        .iter()
        .map(|table| {
            let qualified = table.qualified();
            let summary = if table.body.is_empty() {
                "(columns unavailable)".to_string()
            } else {
                flatten(&table.body, TABLE_SUMMARY_CHARS)
            };
            let rows = stats
                .iter()
                .find(|s| s.table == qualified)
                .and_then(|s| s.row_count)
                .map(|n| format!(" (~{} rows)", n))
                .unwrap_or_default();
            format!("- {}: {}{}", qualified, summary, rows)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn query_lines(queries: &[WorkloadQuery]) -> String {
    if queries.is_empty() {
        return NO_QUERIES_LINE.to_string();
    }
    queries
        .iter()
        .map(|q| format!("- {} (runs {}): {}", q.id, q.run_quantity, flatten(&q.text, QUERY_SUMMARY_CHARS)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Newlines to spaces, cut at `max` characters
fn flatten(text: &str, max: usize) -> String {
    text.replace('\n', " ").chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionResponse;
    use crate::llm::client::mock::MockLlmClient;

    fn orders() -> Vec<TableIdentifier> {
        vec![TableIdentifier::parse("CREATE TABLE sales.public.orders (id BIGINT,\n total DOUBLE)").unwrap()]
    }

    fn workload() -> Vec<WorkloadQuery> {
        vec![WorkloadQuery::new("q1", "SELECT *\nFROM sales.public.orders", 7)]
    }

    fn advisor(client: MockLlmClient) -> (Advisor, Arc<MockLlmClient>) {
        let client = Arc::new(client);
        let advisor = Advisor::new(client.clone(), Arc::new(PromptLoader::embedded_only()), 1024);
        (advisor, client)
    }

    #[test]
    fn test_table_lines() {
        let stats = vec![TableStats {
            table: "sales.public.orders".to_string(),
            row_count: Some(1200),
            error: None,
        }];
        assert_eq!(
            table_lines(&orders(), &stats),
            "- sales.public.orders: (id BIGINT,  total DOUBLE) (~1200 rows)"
        );
        assert_eq!(table_lines(&[], &[]), NO_TABLES_LINE);
    }

    #[test]
    fn test_table_line_without_body() {
        let tables = vec![TableIdentifier {
            catalog: "c".to_string(),
            schema: "s".to_string(),
            table: "t".to_string(),
            body: String::new(),
            original: "CREATE TABLE c.s.t".to_string(),
        }];
        assert_eq!(table_lines(&tables, &[]), "- c.s.t: (columns unavailable)");
    }

    #[test]
    fn test_query_lines() {
        assert_eq!(query_lines(&workload()), "- q1 (runs 7): SELECT * FROM sales.public.orders");
        assert_eq!(query_lines(&[]), NO_QUERIES_LINE);
    }

    #[test]
    fn test_flatten_truncates_by_chars() {
        let text = "é".repeat(400);
        assert_eq!(flatten(&text, QUERY_SUMMARY_CHARS).chars().count(), 320);
    }

    #[tokio::test]
    async fn test_suggest_decodes_fenced_candidate() {
        let answer = "Here you go:\n```json\n{\"ddl\": [\"CREATE SCHEMA sales.opt_1\"], \"migrations\": [], \"queries\": []}\n```";
        let (advisor, client) = advisor(MockLlmClient::new(vec![CompletionResponse::text(answer)]));
        let target = TargetSchema::new("sales", "opt_1");
        let tables = orders();
        let queries = workload();
        let input = AdvisorInput {
            target: &target,
            tables: &tables,
            stats: &[],
            queries: &queries,
        };

        let candidate = advisor.suggest(&input).await.unwrap();
        assert_eq!(candidate.ddl, vec!["CREATE SCHEMA sales.opt_1"]);

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("CREATE SCHEMA sales.opt_1"));
        assert!(prompts[0].contains("- q1 (runs 7): SELECT * FROM sales.public.orders"));
    }

    #[tokio::test]
    async fn test_suggest_absorbs_failures() {
        let target = TargetSchema::new("sales", "opt_1");
        let input = AdvisorInput {
            target: &target,
            tables: &[],
            stats: &[],
            queries: &[],
        };

        let (failing, _) = advisor(MockLlmClient::scripted(vec![Err("boom".to_string())]));
        assert!(failing.suggest(&input).await.is_none());

        let (chatty, _) = advisor(MockLlmClient::new(vec![CompletionResponse::text("no json here")]));
        assert!(chatty.suggest(&input).await.is_none());

        let (silent, _) = advisor(MockLlmClient::new(vec![CompletionResponse::default()]));
        assert!(silent.suggest(&input).await.is_none());
    }
}
