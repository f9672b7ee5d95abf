//! Rule translation facade
//!
//! The only part of the translator that touches external request/response
//! shapes. Get direction: raw backend rules in, structured rules out, with
//! untranslatable rules silently omitted. Update direction: an ordered
//! operation batch in, per-index error records out.

use std::sync::Arc;

use crate::folders::LabelResolver;
use crate::store::{RuleStore, StoreResult};

use super::actions::parse_actions;
use super::conditions::parse_conditions;
use super::serializer::build_raw_rule;
use super::{OperationError, RawRule, Rule, RuleOperation};

/// Facade over the grammar translator and the two external collaborators.
pub struct RuleEngine {
    store: Arc<dyn RuleStore>,
    folders: Arc<dyn LabelResolver>,
}

impl RuleEngine {
    pub fn new(store: Arc<dyn RuleStore>, folders: Arc<dyn LabelResolver>) -> Self {
        Self { store, folders }
    }

    /// Fetch and translate every rule of a mailbox. Rules that fail to
    /// parse, or parse to less than a complete rule, are omitted without a
    /// failure signal; the response carries only what translated cleanly.
    pub async fn get_rules(&self, user_id: &str) -> StoreResult<Vec<Rule>> {
        let raw_rules = self.store.list_rules(user_id).await?;

        let mut rules = Vec::with_capacity(raw_rules.len());
        for raw in &raw_rules {
            match self.translate_rule(user_id, raw).await {
                Some(rule) => rules.push(rule),
                None => log::info!("omitting rule {:?}: not translatable", raw.id),
            }
        }
        Ok(rules)
    }

    /// Translate one raw rule. Both phrases must parse and both sides must
    /// end up non-empty; anything less yields None and the rule is excluded
    /// rather than partially populated.
    pub async fn translate_rule(&self, user_id: &str, raw: &RawRule) -> Option<Rule> {
        let conditions = match raw.condition_phrase.as_deref() {
            Some(phrase) if !phrase.trim().is_empty() => Some(parse_conditions(phrase)?),
            _ => None,
        };
        let actions = match raw.action_phrase.as_deref() {
            Some(phrase) if !phrase.trim().is_empty() => {
                Some(parse_actions(phrase, user_id, self.folders.as_ref()).await?)
            }
            _ => None,
        };

        let rule = Rule {
            id: raw.id.clone(),
            display_name: raw.display_name.clone(),
            priority: raw.priority,
            enabled: raw.enabled,
            conditions,
            actions,
        };
        rule.is_complete().then_some(rule)
    }

    /// Apply a create/set/delete batch strictly in input order, one
    /// operation at a time. Failures are accumulated against the operation's
    /// original index and never abort the batch; a later operation runs
    /// whether or not an earlier one failed. Sequencing is what keeps the
    /// index-to-error correspondence honest, so operations are awaited one
    /// by one, never fired concurrently.
    pub async fn apply_operations(
        &self,
        user_id: &str,
        operations: Vec<RuleOperation>,
    ) -> Vec<OperationError> {
        let mut errors = Vec::new();
        for (index, operation) in operations.into_iter().enumerate() {
            if let Err(error) = self.apply_operation(user_id, index, operation).await {
                log::warn!(
                    "rule operation {index} failed for user {user_id}: {}",
                    error.message
                );
                errors.push(error);
            }
        }
        errors
    }

    async fn apply_operation(
        &self,
        user_id: &str,
        index: usize,
        operation: RuleOperation,
    ) -> Result<(), OperationError> {
        match operation {
            RuleOperation::Create { rule } => {
                if !rule.is_complete() {
                    return Err(OperationError::unsupported_rule(index, &rule.display_name));
                }
                let raw = build_raw_rule(&rule);
                let rule_id = self
                    .store
                    .create_rule(user_id, &raw)
                    .await
                    .map_err(|e| OperationError::store_failure(index, "", e))?;
                log::info!("created rule {rule_id} for user {user_id}");
                Ok(())
            }
            RuleOperation::Set { rule_id, rule } => {
                let rule_id = rule_id
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| OperationError::missing_rule_id(index))?;
                if !rule.is_complete() {
                    return Err(OperationError::unsupported_rule(index, &rule.display_name));
                }
                let raw = build_raw_rule(&rule);
                self.store
                    .update_rule(user_id, &rule_id, &raw)
                    .await
                    .map_err(|e| OperationError::store_failure(index, &rule_id, e))?;
                log::info!("updated rule {rule_id} for user {user_id}");
                Ok(())
            }
            RuleOperation::Delete { rule_id } => {
                let rule_id = rule_id
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| OperationError::missing_rule_id(index))?;
                self.store
                    .delete_rule(user_id, &rule_id)
                    .await
                    .map_err(|e| OperationError::store_failure(index, &rule_id, e))?;
                log::info!("deleted rule {rule_id} for user {user_id}");
                Ok(())
            }
        }
    }
}
