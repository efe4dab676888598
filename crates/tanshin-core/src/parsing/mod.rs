pub mod header;
pub mod labels;
pub mod text;
pub mod values;

pub use labels::{LabelMatch, LabelMatcher, LabelScorer, LcsRatio, MatchKind};
pub use values::parse_value;
