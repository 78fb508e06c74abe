mod affinity;
pub use affinity::AffinityLabel;

mod binding;
pub use binding::LabelBinding;

mod expr;
pub use expr::{LabelExpr, is_valid_atom};

mod set;
pub use set::LabelSet;
