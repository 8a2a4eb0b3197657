mod expression;
mod filter;
mod plan;
mod planner;

pub use expression::Expression;
pub use filter::{Condition, Filter};
pub use plan::{Aggregate, Direction, Plan, Projection, ProjectionMode, Stage};
pub use planner::Planner;
