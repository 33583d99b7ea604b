use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Order {order} out of range: must be between 1 and {max}")]
    OrderOutOfRange { order: u32, max: u32 },

    #[error("Split depth {segments_order} too deep for order {order}: at most {max} allowed")]
    SplitTooDeep {
        order: u32,
        segments_order: u32,
        max: u32,
    },

    #[error("Invalid branching factor: {0} (must be at least 1)")]
    InvalidBranching(u32),

    #[error(
        "Address precondition violated: total depth {total_depth}, level depth {level_depth} \
         (difference must be 0 or at least 4)"
    )]
    AddressPrecondition { total_depth: u32, level_depth: u32 },

    #[error("Fan-in not divisible: {inputs} inputs cannot be split across {targets} targets")]
    FanInNotDivisible { inputs: usize, targets: usize },

    #[error("Range not divisible: 2^{half_order} keys cannot be split into {segments} segments")]
    RangeNotDivisible { half_order: u32, segments: usize },

    #[error("Duplicate target: {0}")]
    DuplicateTarget(String),

    #[error("Rule {target} depends on {input}, which no rule produces")]
    MissingInput { target: String, input: String },

    #[error("Rule {0} is not reachable from the root target")]
    Unreachable(String),

    #[error("Dependency cycle through {0}")]
    Cycle(String),
}

pub type Result<T> = std::result::Result<T, PlanError>;
