mod build;
mod router;

pub use build::build_table;
pub use router::{ParamVec, Route, RouteBinding, RouteMatch, RouteTable};
