//! DeductibleHandler (C3)
//!
//! Reads the transposed `deductibles_oop` table: one row per `Metric`, one
//! column per member id. Column-name interpolation is guarded by
//! `adapters::is_safe_identifier` before any SQL string is built — this is
//! the one place in the crate where a value ends up inside the query text
//! rather than bound as a parameter (spec §4.3/§4.10).

use crate::adapters::{is_safe_identifier, RelationalAdapter};
use crate::entities::{HandlerResult, MetricSet, PlanBucket};
use tracing::warn;

enum Family {
    Deductible,
    Oop,
}

enum Bucket {
    Individual,
    Family,
}

enum Network {
    Ppo,
    Par,
    Oon,
}

enum Suffix {
    Base,
    Met,
    Remaining,
}

struct ParsedMetric {
    family: Family,
    bucket: Bucket,
    network: Network,
    suffix: Suffix,
}

fn parse_metric_name(name: &str) -> Option<ParsedMetric> {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    if tokens.len() < 3 {
        return None;
    }
    let family = match tokens[0] {
        "Deductible" => Family::Deductible,
        "OOP" => Family::Oop,
        _ => return None,
    };
    let bucket = match tokens[1] {
        "IND" => Bucket::Individual,
        "FAM" => Bucket::Family,
        _ => return None,
    };
    let network = match tokens[2] {
        "PPO" => Network::Ppo,
        "PAR" => Network::Par,
        "OON" => Network::Oon,
        _ => return None,
    };
    let suffix = match tokens.get(3) {
        None => Suffix::Base,
        Some(&"Met") | Some(&"met") => Suffix::Met,
        Some(&"Remaining") => Suffix::Remaining,
        _ => return None,
    };
    Some(ParsedMetric {
        family,
        bucket,
        network,
        suffix,
    })
}

fn apply_metric(bucket: &mut PlanBucket, parsed: &ParsedMetric, value: i64) {
    let slot: &mut Option<MetricSet> = match parsed.network {
        Network::Ppo => &mut bucket.ppo,
        Network::Par => &mut bucket.par,
        Network::Oon => &mut bucket.oon,
    };
    let metric_set = slot.get_or_insert_with(MetricSet::default);
    match (&parsed.family, &parsed.suffix) {
        (Family::Deductible, Suffix::Base) => metric_set.deductible = Some(value),
        (Family::Deductible, Suffix::Met) => metric_set.deductible_met = Some(value),
        (Family::Deductible, Suffix::Remaining) => metric_set.deductible_remaining = Some(value),
        (Family::Oop, Suffix::Base) => metric_set.oop = Some(value),
        (Family::Oop, Suffix::Met) => metric_set.oop_met = Some(value),
        (Family::Oop, Suffix::Remaining) => metric_set.oop_remaining = Some(value),
    }
}

fn fill_computed_remaining(bucket: &mut PlanBucket) {
    for slot in [&mut bucket.ppo, &mut bucket.par, &mut bucket.oon] {
        if let Some(ms) = slot {
            if ms.deductible_remaining.is_none() {
                if let (Some(base), Some(met)) = (ms.deductible, ms.deductible_met) {
                    ms.deductible_remaining = Some((base - met).max(0));
                }
            }
            if ms.oop_remaining.is_none() {
                if let (Some(base), Some(met)) = (ms.oop, ms.oop_met) {
                    ms.oop_remaining = Some((base - met).max(0));
                }
            }
        }
    }
}

fn restrict_network(bucket: &mut PlanBucket, network: &str) {
    let network = network.to_lowercase();
    if network != "ppo" {
        bucket.ppo = None;
    }
    if network != "par" {
        bucket.par = None;
    }
    if network != "oon" {
        bucket.oon = None;
    }
}

fn restrict_plan_type(individual: &mut PlanBucket, family: &mut PlanBucket, plan_type: &str) {
    match plan_type.to_lowercase().as_str() {
        "individual" | "ind" => *family = PlanBucket::default(),
        "family" | "fam" => *individual = PlanBucket::default(),
        _ => {}
    }
}

pub struct DeductibleHandler<A: RelationalAdapter + ?Sized> {
    relational: std::sync::Arc<A>,
}

impl<A: RelationalAdapter + ?Sized> DeductibleHandler<A> {
    pub fn new(relational: std::sync::Arc<A>) -> Self {
        Self { relational }
    }

    pub async fn lookup(
        &self,
        member_id: &str,
        plan_type: Option<&str>,
        network: Option<&str>,
    ) -> HandlerResult {
        if !is_safe_identifier(member_id) {
            return HandlerResult::Deductible {
                found: false,
                member_id: member_id.to_string(),
                individual: PlanBucket::default(),
                family: PlanBucket::default(),
                message: Some("invalid member id".to_string()),
            };
        }

        let sql = format!(
            "SELECT \"Metric\" AS metric, \"{0}\" AS value FROM deductibles_oop WHERE \"{0}\" IS NOT NULL",
            member_id
        );

        let rows = match self.relational.query_with_strings(&sql, &[]).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "deductible lookup failed");
                return HandlerResult::Deductible {
                    found: false,
                    member_id: member_id.to_string(),
                    individual: PlanBucket::default(),
                    family: PlanBucket::default(),
                    message: Some("lookup failed".to_string()),
                };
            }
        };

        if rows.is_empty() {
            return HandlerResult::Deductible {
                found: false,
                member_id: member_id.to_string(),
                individual: PlanBucket::default(),
                family: PlanBucket::default(),
                message: Some("no matching rows".to_string()),
            };
        }

        let mut individual = PlanBucket::default();
        let mut family = PlanBucket::default();

        for row in &rows {
            let metric_name = match row.get("metric") {
                Some(m) => m,
                None => continue,
            };
            let value = match row.get("value").and_then(|v| v.parse::<i64>().ok()) {
                Some(v) => v,
                None => continue,
            };
            let parsed = match parse_metric_name(metric_name) {
                Some(p) => p,
                None => continue,
            };
            let target = match parsed.bucket {
                Bucket::Individual => &mut individual,
                Bucket::Family => &mut family,
            };
            apply_metric(target, &parsed, value);
        }

        fill_computed_remaining(&mut individual);
        fill_computed_remaining(&mut family);

        if let Some(net) = network {
            restrict_network(&mut individual, net);
            restrict_network(&mut family, net);
        }
        if let Some(pt) = plan_type {
            restrict_plan_type(&mut individual, &mut family, pt);
        }

        HandlerResult::Deductible {
            found: true,
            member_id: member_id.to_string(),
            individual,
            family,
            message: None,
        }
    }
}
