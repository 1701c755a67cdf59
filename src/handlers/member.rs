//! MemberHandler (C2)

use crate::adapters::RelationalAdapter;
use crate::entities::HandlerResult;
use tracing::warn;

pub struct MemberHandler<A: RelationalAdapter + ?Sized> {
    relational: std::sync::Arc<A>,
}

impl<A: RelationalAdapter + ?Sized> MemberHandler<A> {
    pub fn new(relational: std::sync::Arc<A>) -> Self {
        Self { relational }
    }

    pub async fn verify(
        &self,
        member_id: Option<&str>,
        dob: Option<&str>,
        name: Option<&str>,
    ) -> HandlerResult {
        if member_id.is_none() && dob.is_none() && name.is_none() {
            return HandlerResult::Member {
                valid: false,
                member_id: None,
                name: None,
                dob: None,
                message: Some("missing parameters".to_string()),
            };
        }

        let mut clauses = Vec::new();
        let mut params = Vec::new();
        if let Some(id) = member_id {
            clauses.push(format!("member_id = ${}", params.len() + 1));
            params.push(id.to_string());
        }
        if let Some(d) = dob {
            clauses.push(format!("dob = ${}", params.len() + 1));
            params.push(d.to_string());
        }
        if let Some(n) = name {
            let token = format!("%{}%", n.to_lowercase());
            clauses.push(format!(
                "(LOWER(first_name || ' ' || last_name) LIKE ${0} OR LOWER(first_name) LIKE ${0} OR LOWER(last_name) LIKE ${0})",
                params.len() + 1
            ));
            params.push(token);
        }

        let sql = format!(
            "SELECT member_id, first_name, last_name, dob FROM members WHERE {} LIMIT 1",
            clauses.join(" AND ")
        );

        match self.relational.query_with_strings(&sql, &params).await {
            Ok(rows) => match rows.into_iter().next() {
                Some(row) => {
                    let found_id = row.get("member_id").unwrap_or_default().to_string();
                    let first = row.get("first_name").unwrap_or_default();
                    let last = row.get("last_name").unwrap_or_default();
                    let dob = row.get("dob").map(str::to_string);
                    HandlerResult::Member {
                        valid: true,
                        member_id: Some(found_id),
                        name: Some(format!("{} {}", first, last).trim().to_string()),
                        dob,
                        message: None,
                    }
                }
                None => HandlerResult::Member {
                    valid: false,
                    member_id: None,
                    name: None,
                    dob: None,
                    message: Some("authentication failed".to_string()),
                },
            },
            Err(e) => {
                warn!(error = %e, "member lookup failed");
                HandlerResult::Member {
                    valid: false,
                    member_id: None,
                    name: None,
                    dob: None,
                    message: Some("authentication failed".to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::relational::Row;
    use crate::error::CoreResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct FakeRelational {
        rows: Vec<Row>,
        fail: bool,
    }

    #[async_trait]
    impl RelationalAdapter for FakeRelational {
        async fn query_with_strings(&self, _sql: &str, _params: &[String]) -> CoreResult<Vec<Row>> {
            if self.fail {
                return Err(crate::error::CoreError::IntegrationPermanent("boom".to_string()));
            }
            Ok(self.rows.clone())
        }

        async fn is_initialized(&self) -> bool {
            true
        }
    }

    fn row(member_id: &str, first: &str, last: &str, dob: &str) -> Row {
        let mut columns = HashMap::new();
        columns.insert("member_id".to_string(), Some(member_id.to_string()));
        columns.insert("first_name".to_string(), Some(first.to_string()));
        columns.insert("last_name".to_string(), Some(last.to_string()));
        columns.insert("dob".to_string(), Some(dob.to_string()));
        Row { columns }
    }

    #[tokio::test]
    async fn missing_all_parameters_is_invalid() {
        let handler = MemberHandler::new(Arc::new(FakeRelational { rows: vec![], fail: false }));
        let result = handler.verify(None, None, None).await;
        match result {
            HandlerResult::Member { valid, message, .. } => {
                assert!(!valid);
                assert_eq!(message.as_deref(), Some("missing parameters"));
            }
            _ => panic!("expected Member variant"),
        }
    }

    #[tokio::test]
    async fn found_row_is_valid() {
        let handler = MemberHandler::new(Arc::new(FakeRelational {
            rows: vec![row("M1001", "Jane", "Doe", "1980-01-01")],
            fail: false,
        }));
        let result = handler.verify(Some("M1001"), None, None).await;
        match result {
            HandlerResult::Member { valid, name, .. } => {
                assert!(valid);
                assert_eq!(name.as_deref(), Some("Jane Doe"));
            }
            _ => panic!("expected Member variant"),
        }
    }

    #[tokio::test]
    async fn unknown_member_id_is_authentication_failed() {
        let handler = MemberHandler::new(Arc::new(FakeRelational { rows: vec![], fail: false }));
        let result = handler.verify(Some("M9999"), None, None).await;
        match result {
            HandlerResult::Member { valid, message, .. } => {
                assert!(!valid);
                assert_eq!(message.as_deref(), Some("authentication failed"));
            }
            _ => panic!("expected Member variant"),
        }
    }

    #[tokio::test]
    async fn data_source_error_does_not_leak_details() {
        let handler = MemberHandler::new(Arc::new(FakeRelational { rows: vec![], fail: true }));
        let result = handler.verify(Some("M1001"), None, None).await;
        match result {
            HandlerResult::Member { valid, message, .. } => {
                assert!(!valid);
                assert_eq!(message.as_deref(), Some("authentication failed"));
            }
            _ => panic!("expected Member variant"),
        }
    }
}
