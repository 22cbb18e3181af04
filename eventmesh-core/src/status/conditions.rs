//! # Condition convergence engine
//!
//! Every reconciled resource aggregates the readiness of its dependencies
//! into a single observable `Ready` condition. A [`ConditionSet`] declares
//! which dependent condition types a resource kind tracks; a
//! [`ConditionManager`] borrows the resource's condition storage and applies
//! all mutations through it, recomputing `Ready` after every change.
//!
//! `Ready` is never set directly by callers: it is derived from the
//! dependents. Aggregation never produces a hard failure — missing
//! information maps to `Unknown`, explicit negative signals map to `False`
//! with a reason/message pair, and the storage stays serializable throughout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// The tri-state value of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// Names of the conditions tracked across the mesh's resource kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
pub enum ConditionType {
    Ready,
    Addressable,
    ChannelsReady,
    SubscriptionsReady,
    IngressReady,
    FilterReady,
    TriggerChannelReady,
    BrokerReady,
    SubscriberResolved,
}

impl ConditionType {
    fn sort_key(&self) -> String {
        self.to_string()
    }
}

/// A named readiness signal on a resource's status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    fn new(condition_type: ConditionType, status: ConditionStatus) -> Self {
        Self {
            condition_type,
            status,
            reason: String::new(),
            message: String::new(),
            last_transition_time: Utc::now(),
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    pub fn is_false(&self) -> bool {
        self.status == ConditionStatus::False
    }

    /// Equality ignoring the transition timestamp. Used to decide whether a
    /// mark is a real transition.
    fn semantically_equals(&self, other: &Self) -> bool {
        self.condition_type == other.condition_type
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// The tracked dependent condition types of one resource kind, plus the
/// derived happy type.
#[derive(Debug, Clone, Copy)]
pub struct ConditionSet {
    happy: ConditionType,
    dependents: &'static [ConditionType],
}

impl ConditionSet {
    pub const fn new(dependents: &'static [ConditionType]) -> Self {
        Self {
            happy: ConditionType::Ready,
            dependents,
        }
    }

    pub fn happy(&self) -> ConditionType {
        self.happy
    }

    pub fn dependents(&self) -> &'static [ConditionType] {
        self.dependents
    }

    /// Whether this set tracks the given type (dependent or happy).
    pub fn tracks(&self, condition_type: ConditionType) -> bool {
        condition_type == self.happy || self.dependents.contains(&condition_type)
    }

    /// Borrows the given storage for mutation through this set.
    pub fn manage<'a>(&'a self, conditions: &'a mut Vec<Condition>) -> ConditionManager<'a> {
        ConditionManager {
            set: self,
            conditions,
        }
    }

    /// Returns the condition of the given type, or `None` when absent or
    /// untracked. Never fabricates a condition.
    pub fn get<'a>(
        &self,
        conditions: &'a [Condition],
        condition_type: ConditionType,
    ) -> Option<&'a Condition> {
        conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    /// True iff the happy condition is present and `True`.
    pub fn is_happy(&self, conditions: &[Condition]) -> bool {
        self.get(conditions, self.happy).is_some_and(|c| c.is_true())
    }
}

/// Applies condition mutations and keeps the derived happy condition in sync.
pub struct ConditionManager<'a> {
    set: &'a ConditionSet,
    conditions: &'a mut Vec<Condition>,
}

impl ConditionManager<'_> {
    /// Inserts every tracked condition that is absent with status `Unknown`.
    ///
    /// Idempotent: repeated calls never downgrade an already-set condition
    /// and never duplicate a type.
    pub fn initialize_conditions(&mut self) {
        for condition_type in self
            .set
            .dependents
            .iter()
            .copied()
            .chain(std::iter::once(self.set.happy))
        {
            if self.set.get(self.conditions, condition_type).is_none() {
                self.store(Condition::new(condition_type, ConditionStatus::Unknown));
            }
        }
    }

    pub fn get_condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.set.get(self.conditions, condition_type)
    }

    pub fn mark_true(&mut self, condition_type: ConditionType) {
        self.mark(condition_type, ConditionStatus::True, "", "");
    }

    pub fn mark_false(&mut self, condition_type: ConditionType, reason: &str, message: &str) {
        self.mark(condition_type, ConditionStatus::False, reason, message);
    }

    pub fn mark_unknown(&mut self, condition_type: ConditionType, reason: &str, message: &str) {
        self.mark(condition_type, ConditionStatus::Unknown, reason, message);
    }

    fn mark(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) {
        // The happy condition is derived, never marked directly.
        if condition_type != self.set.happy {
            self.store(Condition {
                condition_type,
                status,
                reason: reason.to_string(),
                message: message.to_string(),
                last_transition_time: Utc::now(),
            });
        }
        self.recompute_happy();
    }

    /// Aggregates the dependents into the happy condition.
    ///
    /// Dependents are visited in their declared order: the first `False`
    /// wins and its reason/message are inherited; otherwise any `Unknown`
    /// (or absent) dependent yields `Unknown` with cleared reason; otherwise
    /// all dependents are `True` and so is the happy condition.
    fn recompute_happy(&mut self) {
        let mut happy = Condition::new(self.set.happy, ConditionStatus::True);
        for dependent in self.set.dependents {
            match self.set.get(self.conditions, *dependent) {
                Some(c) if c.is_false() => {
                    happy.status = ConditionStatus::False;
                    happy.reason = c.reason.clone();
                    happy.message = c.message.clone();
                    break;
                }
                Some(c) if c.is_true() => {}
                _ => {
                    happy.status = ConditionStatus::Unknown;
                }
            }
        }
        self.store(happy);
    }

    /// Aggregates a fan-out dependency collection into one dependent
    /// condition.
    ///
    /// The aggregate is `True` iff the collection is non-empty and every
    /// child satisfies the predicate; an empty collection is explicitly not
    /// vacuously ready.
    pub fn propagate_child_statuses<T>(
        &mut self,
        condition_type: ConditionType,
        children: &[T],
        ready: impl Fn(&T) -> bool,
    ) {
        if children.is_empty() {
            self.mark_false(condition_type, "NoChildren", "no dependents exist");
            return;
        }
        let not_ready = children.iter().filter(|c| !ready(c)).count();
        if not_ready == 0 {
            self.mark_true(condition_type);
        } else {
            self.mark_false(
                condition_type,
                "ChildrenNotReady",
                &format!("{not_ready} of {} dependents are not ready", children.len()),
            );
        }
    }

    /// Upserts a condition, preserving the sort-stable storage order and the
    /// previous transition time when nothing but the timestamp would change.
    fn store(&mut self, condition: Condition) {
        if let Some(existing) = self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        {
            if !existing.semantically_equals(&condition) {
                *existing = condition;
            }
            return;
        }
        self.conditions.push(condition);
        self.conditions
            .sort_by_key(|c| c.condition_type.sort_key());
    }
}
