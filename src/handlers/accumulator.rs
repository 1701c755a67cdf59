//! AccumulatorHandler (C4)
//!
//! Same transposed-table shape as DeductibleHandler, but rows are keyed by
//! `<Service> <Used|Limit|Remaining>` rather than plan/network buckets
//! (spec §4.4).

use crate::adapters::{is_safe_identifier, RelationalAdapter};
use crate::entities::{AccumulatorMetric, HandlerResult};
use std::collections::HashMap;
use tracing::warn;

enum Suffix {
    Used,
    Limit,
    Remaining,
}

fn parse_metric_name(name: &str) -> Option<(String, Suffix)> {
    let (suffix_word, suffix) = if let Some(stripped) = name.strip_suffix(" Used") {
        (stripped, Suffix::Used)
    } else if let Some(stripped) = name.strip_suffix(" Limit") {
        (stripped, Suffix::Limit)
    } else if let Some(stripped) = name.strip_suffix(" Remaining") {
        (stripped, Suffix::Remaining)
    } else {
        return None;
    };
    if suffix_word.is_empty() {
        return None;
    }
    Some((suffix_word.to_string(), suffix))
}

#[derive(Default)]
struct PartialMetric {
    used: Option<i64>,
    limit: Option<i64>,
    remaining: Option<i64>,
}

pub struct AccumulatorHandler<A: RelationalAdapter + ?Sized> {
    relational: std::sync::Arc<A>,
}

impl<A: RelationalAdapter + ?Sized> AccumulatorHandler<A> {
    pub fn new(relational: std::sync::Arc<A>) -> Self {
        Self { relational }
    }

    pub async fn lookup(&self, member_id: &str, service: Option<&str>) -> HandlerResult {
        if !is_safe_identifier(member_id) {
            return HandlerResult::Accumulator {
                found: false,
                member_id: member_id.to_string(),
                services: HashMap::new(),
                message: Some("invalid member id".to_string()),
            };
        }

        let sql = format!(
            "SELECT \"Metric\" AS metric, \"{0}\" AS value FROM benefit_accumulators WHERE \"{0}\" IS NOT NULL",
            member_id
        );

        let rows = match self.relational.query_with_strings(&sql, &[]).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "accumulator lookup failed");
                return HandlerResult::Accumulator {
                    found: false,
                    member_id: member_id.to_string(),
                    services: HashMap::new(),
                    message: Some("lookup failed".to_string()),
                };
            }
        };

        if rows.is_empty() {
            return HandlerResult::Accumulator {
                found: false,
                member_id: member_id.to_string(),
                services: HashMap::new(),
                message: Some("no matching rows".to_string()),
            };
        }

        let mut partials: HashMap<String, PartialMetric> = HashMap::new();
        for row in &rows {
            let metric_name = match row.get("metric") {
                Some(m) => m,
                None => continue,
            };
            let value = match row.get("value").and_then(|v| v.parse::<i64>().ok()) {
                Some(v) => v,
                None => continue,
            };
            let (service_name, suffix) = match parse_metric_name(metric_name) {
                Some(parsed) => parsed,
                None => continue,
            };
            if let Some(filter) = service {
                if !service_name.to_lowercase().contains(&filter.to_lowercase()) {
                    continue;
                }
            }
            let entry = partials.entry(service_name).or_default();
            match suffix {
                Suffix::Used => entry.used = Some(value),
                Suffix::Limit => entry.limit = Some(value),
                Suffix::Remaining => entry.remaining = Some(value),
            }
        }

        let services: HashMap<String, AccumulatorMetric> = partials
            .into_iter()
            .filter_map(|(name, partial)| {
                let used = partial.used?;
                let limit = partial.limit?;
                let remaining = partial.remaining.unwrap_or_else(|| (limit - used).max(0));
                Some((name, AccumulatorMetric { used, limit, remaining }))
            })
            .collect();

        HandlerResult::Accumulator {
            found: true,
            member_id: member_id.to_string(),
            services,
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::relational::Row;
    use crate::error::CoreResult;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FakeRelational {
        rows: Vec<Row>,
    }

    #[async_trait]
    impl RelationalAdapter for FakeRelational {
        async fn query_with_strings(&self, _sql: &str, _params: &[String]) -> CoreResult<Vec<Row>> {
            Ok(self.rows.clone())
        }
        async fn is_initialized(&self) -> bool {
            true
        }
    }

    fn row(metric: &str, value: &str) -> Row {
        let mut columns = HashMap::new();
        columns.insert("metric".to_string(), Some(metric.to_string()));
        columns.insert("value".to_string(), Some(value.to_string()));
        Row { columns }
    }

    #[tokio::test]
    async fn groups_by_service_and_computes_remaining() {
        let handler = AccumulatorHandler::new(Arc::new(FakeRelational {
            rows: vec![
                row("Massage Therapy Used", "6"),
                row("Massage Therapy Limit", "20"),
            ],
        }));
        let result = handler.lookup("M1001", None).await;
        match result {
            HandlerResult::Accumulator { found, services, .. } => {
                assert!(found);
                let metric = services.get("Massage Therapy").expect("service present");
                assert_eq!(metric.remaining, 14);
            }
            _ => panic!("expected Accumulator variant"),
        }
    }

    #[tokio::test]
    async fn service_filter_excludes_other_services() {
        let handler = AccumulatorHandler::new(Arc::new(FakeRelational {
            rows: vec![
                row("Massage Therapy Used", "6"),
                row("Massage Therapy Limit", "20"),
                row("Acupuncture Used", "2"),
                row("Acupuncture Limit", "10"),
            ],
        }));
        let result = handler.lookup("M1001", Some("Acupuncture")).await;
        match result {
            HandlerResult::Accumulator { services, .. } => {
                assert_eq!(services.len(), 1);
                assert!(services.contains_key("Acupuncture"));
            }
            _ => panic!("expected Accumulator variant"),
        }
    }

    #[tokio::test]
    async fn rejects_unsafe_member_id() {
        let handler = AccumulatorHandler::new(Arc::new(FakeRelational { rows: vec![] }));
        let result = handler.lookup("1BAD", None).await;
        match result {
            HandlerResult::Accumulator { found, .. } => assert!(!found),
            _ => panic!("expected Accumulator variant"),
        }
    }
}
