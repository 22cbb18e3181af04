//! Status convergence primitives shared by every reconciled resource kind.

pub mod addressable;
pub mod conditions;

pub use addressable::{Addressable, HasAddress, HasConditions};
pub use conditions::{Condition, ConditionManager, ConditionSet, ConditionStatus, ConditionType};
